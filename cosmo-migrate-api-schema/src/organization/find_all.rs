use serde::{Deserialize, Serialize};

use super::Organization;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindAllOrganizationsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindAllOrganizationsResponse {
    pub organizations: Vec<Organization>,
}
