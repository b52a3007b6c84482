//! JSON-LD form of an annotation.
//!
//! Embedded in the RDF block as the text of an `rdf:Description` whose
//! `rdf:datatype` is [`JSON_LD_DATATYPE`](crate::config::JSON_LD_DATATYPE).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{CNT_NS, CW_NS, JSON_LD_DATATYPE, OA_NS, RDF_NS};
use crate::error::Result;
use crate::types::{EntityKind, KindInfo};

pub const FRAGMENT_SELECTOR: &str = "oa:FragmentSelector";
pub const TEXT_POSITION_SELECTOR: &str = "oa:TextPositionSelector";

/// One annotation in JSON-LD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdAnnotation {
    #[serde(rename = "@context", default)]
    pub context: IndexMap<String, String>,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default = "annotation_type")]
    pub kind: String,
    #[serde(rename = "motivatedBy", default)]
    pub motivated_by: Option<String>,
    #[serde(rename = "annotatedBy", default)]
    pub annotated_by: Option<String>,
    #[serde(rename = "hasBody")]
    pub has_body: JsonLdBody,
    #[serde(rename = "hasTarget")]
    pub has_target: JsonLdTarget,
    #[serde(rename = "cwrcType")]
    pub cwrc_type: EntityKind,
    #[serde(rename = "cwrcDetails", default)]
    pub cwrc_details: KindInfo,
    #[serde(rename = "hasCertainty", default, skip_serializing_if = "Option::is_none")]
    pub has_certainty: Option<String>,
    #[serde(rename = "cwrcInfo", default, skip_serializing_if = "Option::is_none")]
    pub cwrc_info: Option<Value>,
    #[serde(rename = "cwrcAttributes", default, skip_serializing_if = "IndexMap::is_empty")]
    pub cwrc_attributes: IndexMap<String, Value>,
}

pub(crate) fn annotation_type() -> String {
    "oa:Annotation".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdBody {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdTarget {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default = "specific_resource")]
    pub kind: String,
    #[serde(rename = "hasSource")]
    pub has_source: String,
    #[serde(rename = "hasSelector")]
    pub has_selector: JsonLdSelector,
}

pub(crate) fn specific_resource() -> String {
    "oa:SpecificResource".to_string()
}

/// Either a fragment selector (`rdf:value`) or a text position selector
/// (`oa:start`, `oa:end`). Values are xpointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLdSelector {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "rdf:value", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "oa:start", default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(rename = "oa:end", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Context shared by every exported annotation.
#[must_use]
pub fn default_context() -> IndexMap<String, String> {
    [("rdf", RDF_NS), ("oa", OA_NS), ("cw", CW_NS), ("cnt", CNT_NS)]
        .into_iter()
        .map(|(prefix, ns)| (prefix.to_string(), ns.to_string()))
        .collect()
}

impl JsonLdAnnotation {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text.trim())?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Wrap the annotation in its RDF description.
    pub fn to_description(&self) -> Result<String> {
        Ok(format!(
            "<rdf:Description rdf:datatype=\"{JSON_LD_DATATYPE}\"><![CDATA[\n{}\n]]></rdf:Description>",
            self.to_json()?.replace("]]>", "]]]]><![CDATA[>")
        ))
    }
}
