use std::sync::Arc;
use chrono::Utc;
use tracing::info;
use brandbot_common::models::company::is_hex_color;
use brandbot_common::models::{Company, CompanyUpdate};
use crate::repositories::CompanyRepository;
use crate::Error;

/// Tenant branding: read, provision-or-update, delete.
pub struct CompanyService {
    companies: Arc<dyn CompanyRepository>,
}

impl CompanyService {
    pub fn new(companies: Arc<dyn CompanyRepository>) -> Self {
        Self { companies }
    }

    pub async fn get_company(&self, company: &Company) -> Result<Company, Error> {
        self.companies
            .get_company(company.id)
            .await?
            .ok_or_else(|| Error::NotFound("Company not found".into()))
    }

    /// Updates `tenant` in place, or provisions a new company when there is none.
    /// Colors left out keep their current (or default) values; an empty
    /// `logo_url` clears the logo.
    pub async fn upsert_company(&self, tenant: Option<&Company>, update: CompanyUpdate) -> Result<Company, Error> {
        let name = update
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Validation("Name is required".into()))?
            .to_string();
        let primary = validated_color("primary_color", update.primary_color)?;
        let secondary = validated_color("secondary_color", update.secondary_color)?;
        let logo_url = update.logo_url.map(|u| u.trim().to_string());

        match tenant {
            Some(existing) => {
                let mut company = existing.clone();
                company.name = name;
                if let Some(c) = primary {
                    company.primary_color = c;
                }
                if let Some(c) = secondary {
                    company.secondary_color = c;
                }
                if let Some(url) = logo_url {
                    company.logo_url = if url.is_empty() { None } else { Some(url) };
                }
                company.updated_at = Utc::now();
                self.companies.update_company(&company).await?;
                info!("Updated company={} '{}'", company.id, company.name);
                Ok(company)
            }
            None => {
                let mut company = Company::new(&name);
                if let Some(c) = primary {
                    company.primary_color = c;
                }
                if let Some(c) = secondary {
                    company.secondary_color = c;
                }
                company.logo_url = logo_url.filter(|u| !u.is_empty());
                self.companies.create_company(&company).await?;
                info!("Provisioned company={} '{}'", company.id, company.name);
                Ok(company)
            }
        }
    }

    /// Removes the company with its users, bots and everything they own.
    pub async fn delete_company(&self, company: &Company) -> Result<(), Error> {
        self.companies.delete_company(company.id).await?;
        info!("Deleted company={} '{}'", company.id, company.name);
        Ok(())
    }
}

fn validated_color(field: &str, value: Option<String>) -> Result<Option<String>, Error> {
    match value.map(|v| v.trim().to_string()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if is_hex_color(&v) => Ok(Some(v)),
        Some(v) => Err(Error::Validation(format!("Invalid {field}: {v}"))),
    }
}
