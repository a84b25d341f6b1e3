//! Jolokia wire types

use cassmetrics_common::{
    AttributeInfo, AttributeRef, BeanInfo, Error, MetricValue, ObjectName, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Bulk read request entry
#[derive(Debug, Serialize)]
pub(crate) struct ReadRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mbean: &'a str,
    pub attribute: &'a str,
}

impl<'a> ReadRequest<'a> {
    pub(crate) fn new(target: &'a AttributeRef) -> Self {
        Self {
            kind: "read",
            mbean: &target.mbean,
            attribute: &target.attribute,
        }
    }
}

/// Response envelope shared by every Jolokia operation
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub status: u16,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Default, Deserialize)]
struct BeanDescription {
    #[serde(default)]
    attr: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct AttributeDescription {
    #[serde(rename = "type")]
    java_type: Option<String>,
}

/// Convert a `list` response for one domain into bean descriptions
pub(crate) fn parse_list(domain: &str, envelope: Envelope) -> Result<Vec<BeanInfo>> {
    if !envelope.is_ok() {
        return Err(Error::parse(format!(
            "Jolokia list of {domain} failed with status {}: {}",
            envelope.status,
            envelope.error.unwrap_or_default()
        )));
    }

    let beans = match envelope.value {
        Some(Value::Object(beans)) => beans,
        Some(other) => {
            return Err(Error::parse(format!(
                "Jolokia list of {domain} returned {other} instead of an object"
            )));
        }
        None => return Ok(Vec::new()),
    };

    let mut out = Vec::with_capacity(beans.len());
    for (key_properties, description) in beans {
        let Some(name) = ObjectName::from_key_properties(domain, &key_properties) else {
            debug!(domain, key_properties = %key_properties, "Skipping malformed bean name");
            continue;
        };
        let description: BeanDescription = serde_json::from_value(description)
            .map_err(|e| Error::parse(format!("bad description for {name}: {e}")))?;

        let attributes = description
            .attr
            .into_iter()
            .map(|(attr_name, attr)| {
                let attr: AttributeDescription = serde_json::from_value(attr).unwrap_or_default();
                AttributeInfo {
                    name: attr_name,
                    java_type: attr.java_type,
                }
            })
            .collect();

        out.push(BeanInfo { name, attributes });
    }
    Ok(out)
}

/// Convert a bulk `read` response into values aligned with the request
pub(crate) fn parse_read(
    targets: &[AttributeRef],
    responses: Vec<Envelope>,
) -> Result<Vec<Option<MetricValue>>> {
    if responses.len() != targets.len() {
        return Err(Error::parse(format!(
            "Jolokia answered {} of {} read requests",
            responses.len(),
            targets.len()
        )));
    }

    let values = targets
        .iter()
        .zip(responses)
        .map(|(target, response)| {
            if !response.is_ok() {
                debug!(
                    mbean = %target.mbean,
                    attribute = %target.attribute,
                    status = response.status,
                    error = response.error.as_deref().unwrap_or(""),
                    "Attribute read failed"
                );
                return None;
            }
            let value = response.value.as_ref().and_then(metric_value);
            if value.is_none() {
                debug!(mbean = %target.mbean, attribute = %target.attribute, "Unsupported attribute value");
            }
            value
        })
        .collect();
    Ok(values)
}

/// Map a scalar JSON value onto a metric value
#[must_use]
pub fn metric_value(value: &Value) -> Option<MetricValue> {
    match value {
        Value::Bool(b) => Some(MetricValue::Bool(*b)),
        Value::String(s) => Some(MetricValue::Str(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(MetricValue::Int)
            .or_else(|| n.as_f64().map(MetricValue::Float)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
