//! Vocabulary used for users, accounts and session bindings.

use crate::sparql::Iri;

pub const RDF_TYPE: Iri = Iri::from_static("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
pub const XSD_DATE_TIME: Iri = Iri::from_static("http://www.w3.org/2001/XMLSchema#dateTime");

pub const FOAF_PERSON: Iri = Iri::from_static("http://xmlns.com/foaf/0.1/Person");
pub const FOAF_ONLINE_ACCOUNT: Iri = Iri::from_static("http://xmlns.com/foaf/0.1/OnlineAccount");
pub const FOAF_NAME: Iri = Iri::from_static("http://xmlns.com/foaf/0.1/name");
pub const FOAF_ACCOUNT: Iri = Iri::from_static("http://xmlns.com/foaf/0.1/account");
pub const FOAF_ACCOUNT_NAME: Iri = Iri::from_static("http://xmlns.com/foaf/0.1/accountName");

pub const DCT_CREATED: Iri = Iri::from_static("http://purl.org/dc/terms/created");
pub const DCT_MODIFIED: Iri = Iri::from_static("http://purl.org/dc/terms/modified");

pub const MU_UUID: Iri = Iri::from_static("http://mu.semte.ch/vocabularies/core/uuid");

pub const ACCOUNT_PASSWORD: Iri = Iri::from_static("http://mu.semte.ch/vocabularies/account/password");
pub const ACCOUNT_SALT: Iri = Iri::from_static("http://mu.semte.ch/vocabularies/account/salt");
pub const ACCOUNT_STATUS: Iri = Iri::from_static("http://mu.semte.ch/vocabularies/account/status");
pub const STATUS_ACTIVE: Iri = Iri::from_static("http://mu.semte.ch/vocabularies/account/status/active");
pub const STATUS_INACTIVE: Iri =
    Iri::from_static("http://mu.semte.ch/vocabularies/account/status/inactive");

pub const SESSION_ACCOUNT: Iri = Iri::from_static("http://mu.semte.ch/vocabularies/session/account");

pub const DEFAULT_GRAPH: &str = "http://mu.semte.ch/application";
pub const DEFAULT_RESOURCE_BASE: &str = "http://mu.semte.ch/services/registration-service/";
