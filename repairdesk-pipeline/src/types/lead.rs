//! Lead types: Lead, LeadQuality

use super::ids::{LeadId, UserId};
use crate::error::{PipelineError, Result};
use crate::stage::StageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How promising a lead looks to the sales team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadQuality {
    High,
    #[default]
    Medium,
    Low,
}

/// A sales prospect, rendered as one card on the pipeline board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub quality: LeadQuality,
    #[serde(default)]
    pub potential_value: f64,
    #[serde(default)]
    pub sales_stage: StageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_follow_up: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    /// Index within its stage's column
    #[serde(default)]
    pub pipeline_position: u32,
}

impl Lead {
    /// Create a new lead in the "new" stage with a fresh identifier
    pub fn new(customer_name: impl Into<String>) -> Self {
        Self::with_id(LeadId::new(), customer_name)
    }

    /// Create a lead with an existing identifier
    pub fn with_id(id: impl Into<LeadId>, customer_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            customer_name: customer_name.into(),
            company_name: None,
            email: None,
            phone: None,
            source: String::new(),
            quality: LeadQuality::default(),
            potential_value: 0.0,
            sales_stage: StageId::New,
            assigned_to: None,
            next_follow_up: None,
            notes: String::new(),
            pipeline_position: 0,
        }
    }

    /// Set the company name
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company_name = Some(company.into());
        self
    }

    /// Set the contact email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the contact phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set where the lead came from
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the quality rating
    pub fn with_quality(mut self, quality: LeadQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Set the potential deal value
    pub fn with_value(mut self, value: f64) -> Self {
        self.potential_value = value;
        self
    }

    /// Set the sales stage
    pub fn with_stage(mut self, stage: StageId) -> Self {
        self.sales_stage = stage;
        self
    }

    /// Set the owning user
    pub fn with_owner(mut self, owner: impl Into<UserId>) -> Self {
        self.assigned_to = Some(owner.into());
        self
    }

    /// Set the next follow-up time
    pub fn with_follow_up(mut self, at: DateTime<Utc>) -> Self {
        self.next_follow_up = Some(at);
        self
    }

    /// Set free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Check field-level constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().is_empty() {
            return Err(PipelineError::invalid_value("id", "must not be empty"));
        }
        if !self.potential_value.is_finite() || self.potential_value < 0.0 {
            return Err(PipelineError::invalid_value(
                "potential_value",
                format!(
                    "must be a non-negative number, got {}",
                    self.potential_value
                ),
            ));
        }
        Ok(())
    }
}
