use serde::Serialize;
use utoipa::ToSchema;

use crate::entity::{department, status, ticket_type};

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct StatusResponse {
    pub id: i32,
    pub status: String,
}

impl From<&status::Model> for StatusResponse {
    fn from(model: &status::Model) -> Self {
        Self {
            id: model.id,
            status: model.label.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct DepartmentResponse {
    pub id: i32,
    pub department: String,
    pub description: Option<String>,
}

impl From<&department::Model> for DepartmentResponse {
    fn from(model: &department::Model) -> Self {
        Self {
            id: model.id,
            department: model.label.clone(),
            description: model.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct TicketTypeResponse {
    pub id: i32,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub description: Option<String>,
}

impl From<&ticket_type::Model> for TicketTypeResponse {
    fn from(model: &ticket_type::Model) -> Self {
        Self {
            id: model.id,
            ticket_type: model.label.clone(),
            description: model.description.clone(),
        }
    }
}
