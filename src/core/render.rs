//! Template rendering: turn a sealed graph into a document the apply engine
//! consumes.
//!
//! Each resource renders as `Type`, `Properties`, `DependsOn` (sorted union
//! of referenced and explicitly ordered ids), `Metadata` when annotated, and
//! `DeletionPolicy`. Outputs
//! list the discovery parameters and the private-key locator of every key
//! pair the plan generates.

use super::error::Result;
use super::graph::ResourceGraph;
use super::resource::{KeyPair, Resource, Value};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateDocument {
    pub description: String,
    pub resources: IndexMap<String, RenderedResource>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenderedResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: serde_json::Value,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub deletion_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Value,
}

/// Build the template document, resources in creation order.
pub fn document(graph: &ResourceGraph) -> Result<TemplateDocument> {
    let mut resources = IndexMap::new();
    let mut outputs = IndexMap::new();

    for id in graph.execution_order() {
        let Some(node) = graph.get(id) else {
            continue;
        };
        let mut tagged = serde_json::to_value(&node.resource)?;
        let properties = tagged
            .get_mut("properties")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);

        resources.insert(
            id.clone(),
            RenderedResource {
                resource_type: node.resource.type_name().to_string(),
                properties,
                metadata: node.metadata.clone(),
                depends_on: node.dependencies().into_iter().map(String::from).collect(),
                deletion_policy: node.removal_policy.to_string(),
            },
        );

        match &node.resource {
            Resource::Parameter(param) => {
                outputs.insert(
                    format!("{}Name", id),
                    Output {
                        description: param.description.clone(),
                        value: Value::literal(param.name.clone()),
                    },
                );
            }
            Resource::KeyPair(_) => {
                outputs.insert(
                    format!("{}PrivateKeyParameter", id),
                    Output {
                        description: format!("Parameter holding the private key of {}", id),
                        value: KeyPair::private_key_parameter(id),
                    },
                );
            }
            _ => {}
        }
    }

    Ok(TemplateDocument {
        description: format!("{} stack generated by tierplan", graph.name()),
        resources,
        outputs,
    })
}

pub fn to_yaml(graph: &ResourceGraph) -> Result<String> {
    Ok(serde_yaml_ng::to_string(&document(graph)?)?)
}

pub fn to_json(graph: &ResourceGraph) -> Result<String> {
    Ok(serde_json::to_string_pretty(&document(graph)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::GraphBuilder;
    use crate::core::resource::{LogGroup, Parameter, RemovalPolicy};

    fn graph() -> ResourceGraph {
        let mut b = GraphBuilder::new("Test");
        b.add(
            "Param",
            Resource::Parameter(Parameter {
                name: "/test/log-group".to_string(),
                value: Value::reference("Logs"),
                description: "log group name".to_string(),
            }),
        )
        .unwrap();
        b.add_with_policy(
            "Logs",
            Resource::LogGroup(LogGroup { retention_days: 7 }),
            RemovalPolicy::Retain,
        )
        .unwrap();
        b.add(
            "Key",
            Resource::KeyPair(KeyPair {
                key_type: "rsa".to_string(),
                key_format: "pem".to_string(),
            }),
        )
        .unwrap();
        b.depend("Key", "Logs").unwrap();
        b.annotate("Key", "Owner", Value::literal("ops")).unwrap();
        b.seal().unwrap()
    }

    #[test]
    fn test_document_resources_in_creation_order() {
        let doc = document(&graph()).unwrap();
        let ids: Vec<&String> = doc.resources.keys().collect();
        assert_eq!(ids, vec!["Logs", "Key", "Param"]);
    }

    #[test]
    fn test_document_resource_shape() {
        let doc = document(&graph()).unwrap();
        let logs = &doc.resources["Logs"];
        assert_eq!(logs.resource_type, "AWS::Logs::LogGroup");
        assert_eq!(logs.properties["retentionDays"], 7);
        assert_eq!(logs.deletion_policy, "Retain");
        assert!(logs.depends_on.is_empty());

        let param = &doc.resources["Param"];
        assert_eq!(param.depends_on, vec!["Logs"]);
        assert_eq!(param.properties["value"]["Ref"], "Logs");

        // Explicit ordering shows up the same as a reference.
        assert_eq!(doc.resources["Key"].depends_on, vec!["Logs"]);
    }

    #[test]
    fn test_document_outputs() {
        let doc = document(&graph()).unwrap();
        assert_eq!(doc.outputs["ParamName"].value, Value::literal("/test/log-group"));
        assert_eq!(
            doc.outputs["KeyPrivateKeyParameter"].value,
            Value::sub("/ec2/keypair/${Key.KeyPairId}")
        );
    }

    #[test]
    fn test_yaml_and_json_render() {
        let g = graph();
        let yaml = to_yaml(&g).unwrap();
        assert!(yaml.contains("Type: AWS::Logs::LogGroup"));
        assert!(yaml.contains("DeletionPolicy: Retain"));
        let json = to_json(&g).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["Resources"]["Param"]["DependsOn"][0], "Logs");
        assert_eq!(parsed["Description"], "Test stack generated by tierplan");
        assert_eq!(parsed["Resources"]["Key"]["Metadata"]["Owner"], "ops");
        assert!(parsed["Resources"]["Logs"].get("Metadata").is_none());
    }
}
