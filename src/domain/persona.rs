use serde::{Deserialize, Serialize};

/// Test user the model proposes alongside the test cases. All fields are
/// free text and optional in the reply.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Persona {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub relevance: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PersonaRow {
    pub name: String,
    pub role: String,
    pub permissions: String,
    pub attributes: String,
    pub relevance: String,
}

impl PersonaRow {
    pub fn from_persona(persona: &Persona) -> Self {
        Self {
            name: persona.name.clone(),
            role: persona.role.clone(),
            permissions: persona.permissions.clone(),
            attributes: persona.attributes.clone(),
            relevance: persona.relevance.clone(),
        }
    }
}
