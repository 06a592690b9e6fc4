use serde::{Deserialize, Serialize};

/// A stored contact row, serialized as-is in responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CreateContactRequest {
    /// `None` unless all three fields are present and non-empty.
    pub fn into_new_contact(self) -> Option<NewContact> {
        let present = |field: Option<String>| field.filter(|value| !value.is_empty());

        Some(NewContact {
            name: present(self.name)?,
            email: present(self.email)?,
            phone: present(self.phone)?,
        })
    }
}

/// Fields left out of the body keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}
