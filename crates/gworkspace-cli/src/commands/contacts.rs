//! Contacts commands.

use std::sync::Arc;

use gworkspace_api::contacts::{ContactsClient, Person};
use gworkspace_api::transport::Transport;

use crate::error::CliResult;

pub async fn group(transport: Arc<dyn Transport>, name: &str) -> CliResult<()> {
    let people = ContactsClient::new(transport).group_contacts(name).await?;
    print!("{}", render_people(&people));
    Ok(())
}

pub fn render_people(people: &[Person]) -> String {
    let mut out = String::new();
    for person in people {
        out.push_str(&format!("Name: {}\n", person.display_name));
        if !person.emails.is_empty() {
            out.push_str(&format!("Email: {}\n", person.emails.join(", ")));
        }
        if !person.phones.is_empty() {
            out.push_str(&format!("Phone: {}\n", person.phones.join(", ")));
        }
        out.push_str(&"-".repeat(60));
        out.push('\n');
    }
    out
}
