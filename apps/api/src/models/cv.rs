use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The CV shipped with the binary. `CV_PATH` may point at a replacement file.
pub const EMBEDDED_CV: &str = include_str!("../../data/cv.json");

/// End-date token meaning "still in this role".
pub const PRESENT: &str = "Present";

#[derive(Debug, Error)]
pub enum CvError {
    #[error("Failed to read CV file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CV JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Work experience '{role}' references unknown company '{company}'")]
    UnknownCompany { role: String, company: String },

    #[error("Work experience at '{company}' has invalid {field} '{value}': expected a trailing 4-digit year")]
    InvalidDate {
        company: String,
        field: &'static str,
        value: String,
    },

    #[error("Skill '{name}' has level {level}; levels run from 1 to 5")]
    InvalidSkillLevel { name: String, level: u8 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub contact: String,
    pub nationality: String,
    pub availability: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Security,
    Cloud,
    Devops,
    Programming,
    Infrastructure,
    Tools,
    Professional,
    Ai,
}

impl SkillCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Security => "security",
            SkillCategory::Cloud => "cloud",
            SkillCategory::Devops => "devops",
            SkillCategory::Programming => "programming",
            SkillCategory::Infrastructure => "infrastructure",
            SkillCategory::Tools => "tools",
            SkillCategory::Professional => "professional",
            SkillCategory::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub category: SkillCategory,
    /// 1 (basic) to 5 (expert).
    pub level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub role: String,
    /// Key into `CvRecord::companies`.
    pub company: String,
    /// Free text, e.g. "July 2023" or "2001".
    pub start_date: String,
    /// Free text, or "Present" for the current role.
    pub end_date: String,
    pub is_current_role: bool,
    pub description: String,
    pub responsibilities: Vec<String>,
}

/// The structured CV. Built once at startup and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvRecord {
    pub personal_info: PersonalInfo,
    pub profile_summary: String,
    #[serde(default)]
    pub companies: BTreeMap<String, CompanyInfo>,
    pub skills: Vec<Skill>,
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl CvRecord {
    /// Parses and validates a CV from JSON.
    pub fn from_json(json: &str) -> Result<Self, CvError> {
        let record: CvRecord = serde_json::from_str(json)?;
        record.check()?;
        Ok(record)
    }

    /// Loads the CV from `path`, or the embedded copy when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, CvError> {
        match path {
            Some(path) => Self::from_json(&std::fs::read_to_string(path)?),
            None => Self::from_json(EMBEDDED_CV),
        }
    }

    /// Directory entry for a work-history company key.
    pub fn company_info(&self, company: &str) -> Option<&CompanyInfo> {
        self.companies.get(company)
    }

    /// The entry flagged as the current role, if any.
    pub fn current_role(&self) -> Option<&WorkExperience> {
        self.work_experience.iter().find(|e| e.is_current_role)
    }

    fn check(&self) -> Result<(), CvError> {
        for skill in &self.skills {
            if !(1..=5).contains(&skill.level) {
                return Err(CvError::InvalidSkillLevel {
                    name: skill.name.clone(),
                    level: skill.level,
                });
            }
        }

        for exp in &self.work_experience {
            if !self.companies.contains_key(&exp.company) {
                return Err(CvError::UnknownCompany {
                    role: exp.role.clone(),
                    company: exp.company.clone(),
                });
            }
            if trailing_year(&exp.start_date).is_none() {
                return Err(CvError::InvalidDate {
                    company: exp.company.clone(),
                    field: "startDate",
                    value: exp.start_date.clone(),
                });
            }
            if !is_present(&exp.end_date) && trailing_year(&exp.end_date).is_none() {
                return Err(CvError::InvalidDate {
                    company: exp.company.clone(),
                    field: "endDate",
                    value: exp.end_date.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Parses the last whitespace-delimited token of a date as a 4-digit year.
/// Handles both "Month YYYY" and bare "YYYY".
pub fn trailing_year(date: &str) -> Option<i32> {
    let token = date.split_whitespace().last()?;
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

pub fn is_present(date: &str) -> bool {
    date.trim().eq_ignore_ascii_case(PRESENT)
}


/// Minimal CV used across module tests: one company, one 2001–2005 role.
#[cfg(test)]
pub(crate) fn acme_fixture() -> CvRecord {
    CvRecord::from_json(
        r#"{
            "personalInfo": {
                "name": "Jane Example", "email": "jane@example.com", "contact": "+44 0000",
                "nationality": "British", "availability": "Now", "location": "London"
            },
            "profileSummary": "Engineer with a focus on widgets.",
            "companies": {
                "Acme": {"name": "Acme", "description": "Maker of everything."}
            },
            "skills": [
                {"name": "Rust", "category": "programming", "level": 5},
                {"name": "AWS", "category": "cloud", "level": 4},
                {"name": "Go", "category": "programming", "level": 3}
            ],
            "workExperience": [{
                "role": "Widget Engineer", "company": "Acme",
                "startDate": "January 2001", "endDate": "2005", "isCurrentRole": false,
                "description": "Built widgets.",
                "responsibilities": ["Designed widgets", "Shipped widgets"]
            }]
        }"#,
    )
    .expect("fixture CV is valid")
}
