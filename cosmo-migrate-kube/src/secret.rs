use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// `v1/Secret`. Values of `data` are base64, as served by the API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretList {
    #[serde(default)]
    pub items: Vec<Secret>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_secret_list() {
        let json = r#"{
            "kind": "SecretList",
            "apiVersion": "v1",
            "metadata": {"resourceVersion": "123"},
            "items": [
                {
                    "metadata": {"name": "o-1-ws1", "namespace": "phoenix", "uid": "x"},
                    "data": {"eventHubAccessKey": "WVdKag=="},
                    "type": "Opaque"
                },
                {"metadata": {"name": "empty"}}
            ]
        }"#;
        let list: SecretList = serde_json::from_str(json).unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].metadata.name, "o-1-ws1");
        assert_eq!(list.items[0].metadata.namespace.as_deref(), Some("phoenix"));
        assert_eq!(
            list.items[0]
                .data
                .as_ref()
                .and_then(|d| d.get("eventHubAccessKey"))
                .map(String::as_str),
            Some("WVdKag==")
        );
        assert_eq!(list.items[1].data, None);
    }
}
