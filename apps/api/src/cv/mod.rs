// Public CV view for the web page.
// The chat prompt reads the full CvRecord; this module only decides what the
// page may show.

pub mod handlers;

use serde::Serialize;

use crate::models::cv::{CompanyInfo, CvRecord, Skill};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub name: String,
    pub nationality: String,
    pub availability: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExperience {
    pub role: String,
    pub company: String,
    pub company_info: CompanyInfo,
    pub start_date: String,
    pub end_date: String,
    pub is_current_role: bool,
    pub description: String,
    pub responsibilities: Vec<String>,
}

/// The CV with contact details removed and company info resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCv {
    pub personal_info: PublicProfile,
    pub profile_summary: String,
    pub skills: Vec<Skill>,
    pub work_experience: Vec<PublicExperience>,
    pub interests: Vec<String>,
}

impl PublicCv {
    pub fn from_record(cv: &CvRecord) -> Self {
        let info = &cv.personal_info;
        PublicCv {
            personal_info: PublicProfile {
                name: info.name.clone(),
                nationality: info.nationality.clone(),
                availability: info.availability.clone(),
                location: info.location.clone(),
            },
            profile_summary: cv.profile_summary.clone(),
            skills: cv.skills.clone(),
            work_experience: cv
                .work_experience
                .iter()
                // company keys are checked at load time
                .filter_map(|exp| {
                    let company_info = cv.company_info(&exp.company)?.clone();
                    Some(PublicExperience {
                        role: exp.role.clone(),
                        company: exp.company.clone(),
                        company_info,
                        start_date: exp.start_date.clone(),
                        end_date: exp.end_date.clone(),
                        is_current_role: exp.is_current_role,
                        description: exp.description.clone(),
                        responsibilities: exp.responsibilities.clone(),
                    })
                })
                .collect(),
            interests: cv.interests.clone(),
        }
    }
}
