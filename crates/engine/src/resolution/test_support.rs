//! Fixtures for stage-level tests
//!
//! [`FixtureRepo`] is a plain map behind the repository trait with a fake
//! clock, so tests can pin creation times and ids.

use std::collections::BTreeMap;

use linkage_core::{
    Contact, ContactId, ContactRepository, LinkageError, LinkageResult, NewContact, Timestamp,
};

pub(crate) struct FixtureRepo {
    pub contacts: BTreeMap<ContactId, Contact>,
    pub clock: u64,
    pub lookups: usize,
    pub updates: usize,
}

impl FixtureRepo {
    pub fn contact(&self, id: u64) -> &Contact {
        &self.contacts[&ContactId::new(id)]
    }
}

impl ContactRepository for FixtureRepo {
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> LinkageResult<Vec<Contact>> {
        self.lookups += 1;
        Ok(self
            .contacts
            .values()
            .filter(|c| c.matches_either(email, phone))
            .cloned()
            .collect())
    }

    fn get(&mut self, id: ContactId) -> LinkageResult<Option<Contact>> {
        Ok(self.contacts.get(&id).cloned())
    }

    fn insert(&mut self, contact: NewContact) -> LinkageResult<Contact> {
        contact.validate()?;
        let id = ContactId::new(self.contacts.keys().last().map_or(1, |k| k.as_u64() + 1));
        self.clock += 1;
        let contact = contact.into_contact(id, Timestamp::from_secs(self.clock));
        self.contacts.insert(id, contact.clone());
        Ok(contact)
    }

    fn update(&mut self, contact: &Contact) -> LinkageResult<()> {
        if !self.contacts.contains_key(&contact.id) {
            return Err(LinkageError::internal("update of unknown contact"));
        }
        self.updates += 1;
        self.contacts.insert(contact.id, contact.clone());
        Ok(())
    }
}

/// Primary created at second `id`
pub(crate) fn primary(id: u64, email: Option<&str>, phone: Option<&str>) -> Contact {
    NewContact::primary(email.map(String::from), phone.map(String::from))
        .into_contact(ContactId::new(id), Timestamp::from_secs(id))
}

/// Secondary of `to`, created at second `id`
pub(crate) fn secondary(id: u64, email: Option<&str>, phone: Option<&str>, to: u64) -> Contact {
    NewContact::secondary(
        email.map(String::from),
        phone.map(String::from),
        ContactId::new(to),
    )
    .into_contact(ContactId::new(id), Timestamp::from_secs(id))
}

pub(crate) fn repo_with(contacts: Vec<Contact>) -> FixtureRepo {
    let clock = contacts
        .iter()
        .map(|c| c.created_at.as_micros() / 1_000_000)
        .max()
        .unwrap_or(0);
    FixtureRepo {
        contacts: contacts.into_iter().map(|c| (c.id, c)).collect(),
        clock,
        lookups: 0,
        updates: 0,
    }
}
