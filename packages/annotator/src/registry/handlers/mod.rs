//! Handlers for the bundled entity kinds.

mod owning;
mod wrapping;

pub use owning::{CitationHandler, KeywordHandler, NoteHandler};
pub use wrapping::{CorrectionHandler, DateHandler, LinkHandler, NamedHandler, TitleHandler};

pub const OA_IDENTIFYING: &str = "http://www.w3.org/ns/oa#identifying";
pub const OA_TAGGING: &str = "http://www.w3.org/ns/oa#tagging";
pub const OA_COMMENTING: &str = "http://www.w3.org/ns/oa#commenting";
pub const OA_CLASSIFYING: &str = "http://www.w3.org/ns/oa#classifying";
pub const OA_EDITING: &str = "http://www.w3.org/ns/oa#editing";
pub const OA_LINKING: &str = "http://www.w3.org/ns/oa#linking";
pub const CW_CITING: &str = "http://cwrc.ca/ns/cw#citing";

pub const FOAF_PERSON: &str = "http://xmlns.com/foaf/0.1/Person";
pub const FOAF_ORGANIZATION: &str = "http://xmlns.com/foaf/0.1/Organization";
pub const GEO_SPATIAL_THING: &str = "http://www.w3.org/2003/01/geo/wgs84_pos#SpatialThing";
pub const DCTERMS_BIBLIOGRAPHIC_RESOURCE: &str = "http://purl.org/dc/terms/BibliographicResource";
pub const TIME_TEMPORAL_ENTITY: &str = "http://www.w3.org/2006/time#TemporalEntity";
