//! Google Contacts through the People API.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::transport::{Request, Service, Transport, decode, drain_pages};

const PERSON_FIELDS: &str = "names,emailAddresses,phoneNumbers,memberships";
const PAGE_SIZE: &str = "100";

/// Display name used for contacts without a name.
pub const NO_NAME: &str = "No name";

/// A contact from the signed-in user's connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub resource_name: String,
    pub display_name: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    /// Resource names of the contact groups this person belongs to.
    pub groups: Vec<String>,
}

impl Person {
    pub fn is_member_of(&self, group: &ContactGroup) -> bool {
        self.groups.iter().any(|g| *g == group.resource_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactGroup {
    pub resource_name: String,
    pub name: String,
    #[serde(default)]
    pub member_count: u32,
}

/// Input for [`ContactsClient::batch_create_contacts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub given_name: String,
    pub family_name: String,
    pub emails: Vec<String>,
    pub phone: Option<String>,
}

impl NewContact {
    pub fn new(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            given_name: given_name.into(),
            family_name: family_name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    fn payload(&self) -> Value {
        let mut person = json!({
            "names": [{"givenName": self.given_name, "familyName": self.family_name}],
        });
        if !self.emails.is_empty() {
            person["emailAddresses"] = self
                .emails
                .iter()
                .map(|email| json!({"type": "work", "value": email}))
                .collect();
        }
        if let Some(phone) = &self.phone {
            person["phoneNumbers"] = json!([{"type": "mobile", "value": phone}]);
        }
        json!({"contactPerson": person})
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonRecord {
    resource_name: String,
    #[serde(default)]
    names: Vec<NameRecord>,
    #[serde(default)]
    email_addresses: Vec<ValueRecord>,
    #[serde(default)]
    phone_numbers: Vec<ValueRecord>,
    #[serde(default)]
    memberships: Vec<MembershipRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NameRecord {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueRecord {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipRecord {
    contact_group_membership: Option<GroupMembership>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupMembership {
    contact_group_resource_name: String,
}

impl From<PersonRecord> for Person {
    fn from(record: PersonRecord) -> Self {
        Self {
            resource_name: record.resource_name,
            display_name: record
                .names
                .into_iter()
                .next()
                .and_then(|name| name.display_name)
                .unwrap_or_else(|| NO_NAME.to_string()),
            emails: record.email_addresses.into_iter().map(|e| e.value).collect(),
            phones: record.phone_numbers.into_iter().map(|p| p.value).collect(),
            groups: record
                .memberships
                .into_iter()
                .filter_map(|m| m.contact_group_membership)
                .map(|m| m.contact_group_resource_name)
                .collect(),
        }
    }
}

/// Finds a group by name, ignoring case.
pub fn find_group_by_name<'a>(groups: &'a [ContactGroup], name: &str) -> Option<&'a ContactGroup> {
    let name = name.to_lowercase();
    groups.iter().find(|group| group.name.to_lowercase() == name)
}

pub fn filter_contacts_by_group<'a>(contacts: &'a [Person], group: &ContactGroup) -> Vec<&'a Person> {
    contacts
        .iter()
        .filter(|person| person.is_member_of(group))
        .collect()
}

/// Indexes contacts by lowercased email address.
///
/// A contact with several addresses appears under each of them; when two
/// contacts share an address the later one wins.
pub fn contacts_by_email(contacts: &[Person]) -> HashMap<String, &Person> {
    contacts
        .iter()
        .flat_map(|person| person.emails.iter().map(move |email| (email.to_lowercase(), person)))
        .collect()
}

/// Client for the People API.
pub struct ContactsClient {
    transport: Arc<dyn Transport>,
}

impl ContactsClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list_contacts(&self) -> ApiResult<Vec<Person>> {
        let request = Request::new(Service::People, "people/me/connections")
            .query("personFields", PERSON_FIELDS)
            .query("pageSize", PAGE_SIZE)
            .items_key("connections");
        let records = drain_pages(self.transport.as_ref(), &request).await?;
        records
            .into_iter()
            .map(|record| decode::<PersonRecord>(record, "person").map(Person::from))
            .collect()
    }

    pub async fn groups(&self) -> ApiResult<Vec<ContactGroup>> {
        let request = Request::new(Service::People, "contactGroups").items_key("contactGroups");
        drain_pages(self.transport.as_ref(), &request)
            .await?
            .into_iter()
            .map(|group| decode(group, "contact group"))
            .collect()
    }

    pub async fn create_group(&self, name: &str) -> ApiResult<ContactGroup> {
        let request = Request::new(Service::People, "contactGroups");
        let created = self
            .transport
            .create(&request, json!({"contactGroup": {"name": name}}))
            .await?;
        info!(group = name, "created contact group");
        decode(created, "contact group")
    }

    /// Returns the contacts that belong to the group called `name`.
    pub async fn group_contacts(&self, name: &str) -> ApiResult<Vec<Person>> {
        let groups = self.groups().await?;
        let group = find_group_by_name(&groups, name)
            .ok_or_else(|| ApiError::not_found(format!("contact group {:?} not found", name)))?;
        let contacts = self.list_contacts().await?;
        Ok(contacts
            .into_iter()
            .filter(|person| person.is_member_of(group))
            .collect())
    }

    /// Creates every group in `names` that does not exist yet.
    ///
    /// Returns the groups that were created.
    pub async fn ensure_groups_exist(&self, names: &[&str]) -> ApiResult<Vec<ContactGroup>> {
        let mut groups = self.groups().await?;
        let mut created = Vec::new();
        for name in names {
            if find_group_by_name(&groups, name).is_none() {
                let group = self.create_group(name).await?;
                groups.push(group.clone());
                created.push(group);
            }
        }
        Ok(created)
    }

    /// Creates contacts in one batch; returns the raw response.
    ///
    /// An empty input sends nothing and returns `None`.
    pub async fn batch_create_contacts(&self, contacts: &[NewContact]) -> ApiResult<Option<Value>> {
        if contacts.is_empty() {
            return Ok(None);
        }
        let body = json!({
            "contacts": contacts.iter().map(NewContact::payload).collect::<Vec<_>>(),
            "readMask": "names",
        });
        let request = Request::new(Service::People, "people:batchCreateContacts");
        let response = self.transport.create(&request, body).await?;
        debug!(count = contacts.len(), "batch created contacts");
        Ok(Some(response))
    }
}
