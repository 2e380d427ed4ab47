use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Kind of appraisal a template or cycle is used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppraisalType {
    Annual,
    SemiAnnual,
    Probationary,
    Project,
}

impl AppraisalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppraisalType::Annual => "ANNUAL",
            AppraisalType::SemiAnnual => "SEMI_ANNUAL",
            AppraisalType::Probationary => "PROBATIONARY",
            AppraisalType::Project => "PROJECT",
        }
    }
}

impl FromStr for AppraisalType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ANNUAL" => Ok(AppraisalType::Annual),
            "SEMI_ANNUAL" => Ok(AppraisalType::SemiAnnual),
            "PROBATIONARY" => Ok(AppraisalType::Probationary),
            "PROJECT" => Ok(AppraisalType::Project),
            other => Err(AppError::validation(format!(
                "Invalid appraisal type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingScaleType {
    #[default]
    Numeric,
    Percentage,
    Likert,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingScale {
    #[serde(rename = "type", default)]
    pub scale_type: RatingScaleType,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl RatingScale {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Label for `value` when the scale carries one per step.
    pub fn label_for(&self, value: f64) -> Option<&str> {
        if self.labels.is_empty() || !self.contains(value) {
            return None;
        }
        let step = self.step.filter(|step| *step > 0.0).unwrap_or(1.0);
        let offset = (value - self.min) / step;
        if offset.fract().abs() > f64::EPSILON {
            return None;
        }
        self.labels.get(offset as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCriterion {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalTemplate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub template_type: AppraisalType,
    pub rating_scale: RatingScale,
    pub criteria: Vec<TemplateCriterion>,
    pub applicable_department_ids: Vec<String>,
    pub applicable_position_ids: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppraisalTemplate {
    pub fn applies_to_department(&self, department_id: &str) -> bool {
        self.applicable_department_ids.is_empty()
            || self
                .applicable_department_ids
                .iter()
                .any(|id| id == department_id)
    }

    pub fn applies_to_position(&self, position_id: &str) -> bool {
        self.applicable_position_ids.is_empty()
            || self
                .applicable_position_ids
                .iter()
                .any(|id| id == position_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCreateInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub template_type: AppraisalType,
    pub rating_scale: RatingScale,
    #[serde(default)]
    pub criteria: Vec<TemplateCriterion>,
    #[serde(default)]
    pub applicable_department_ids: Vec<String>,
    #[serde(default)]
    pub applicable_position_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpdateInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub template_type: Option<AppraisalType>,
    #[serde(default)]
    pub rating_scale: Option<RatingScale>,
    #[serde(default)]
    pub criteria: Option<Vec<TemplateCriterion>>,
    #[serde(default)]
    pub applicable_department_ids: Option<Vec<String>>,
    #[serde(default)]
    pub applicable_position_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateListFilters {
    pub active_only: bool,
    pub template_type: Option<AppraisalType>,
}
