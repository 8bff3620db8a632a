//! Adherent profile payload, as intercepted from the portal's own traffic.
//!
//! The payload carries far more than the agent needs; unknown fields are
//! ignored on purpose so profile additions on the portal side do not break
//! the run.

use serde::Deserialize;

use mgen_core::identity::{Address, Identity};

use crate::error::AgentError;
use crate::extract::parse_portal_date;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdherentProfile {
    email: String,
    numero_insee: String,
    /// Day/month/year, like every date the portal renders.
    date_naissance: String,
    nom: String,
    prenom: String,
    #[serde(default)]
    adresses: Vec<AdherentAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdherentAddress {
    #[serde(default)]
    adresse: String,
    #[serde(default)]
    code_postal: String,
    #[serde(default)]
    ville: String,
    #[serde(default)]
    pays: Option<String>,
}

/// Normalizes the intercepted profile payload into an [`Identity`].
///
/// # Errors
///
/// [`AgentError::Deserialize`] when the payload does not carry the
/// expected fields, [`AgentError::InvalidPayload`] when the birth date
/// does not parse.
pub fn identity_from_profile(payload: &serde_json::Value) -> Result<Identity, AgentError> {
    let profile: AdherentProfile =
        serde_json::from_value(payload.clone()).map_err(|e| AgentError::Deserialize {
            context: "adherent profile payload".to_owned(),
            source: e,
        })?;

    let birth_date =
        parse_portal_date(&profile.date_naissance).ok_or_else(|| AgentError::InvalidPayload {
            context: "adherent profile payload".to_owned(),
            reason: format!("unparseable birth date \"{}\"", profile.date_naissance),
        })?;

    Ok(Identity {
        email: profile.email,
        social_security_number: profile.numero_insee,
        birth_date,
        given_name: profile.prenom,
        family_name: profile.nom,
        address: profile
            .adresses
            .into_iter()
            .map(|address| Address {
                street: address.adresse,
                postcode: address.code_postal,
                city: address.ville,
                country: address.pays,
            })
            .collect(),
    })
}
