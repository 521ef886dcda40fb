//! YAML skeletons offered by the "create resource" editor.
//!
//! The values are placeholders the user is expected to edit before applying.

/// PersistentVolumeClaim skeleton.
pub const PVC_TEMPLATE: &str = r#"apiVersion: v1
kind: PersistentVolumeClaim
metadata:
  name: new-pvc
spec:
  accessModes:
    - ReadWriteOnce
  volumeMode: Filesystem
  resources:
    requests:
      storage: 8Gi
  storageClassName: slow
  selector:
    matchLabels:
      release: "stable"
    matchExpressions:
      - { key: environment, operator: In, values: [dev] }
"#;

/// Looks up the template for a resource kind.
///
/// Accepts the kind name or its kubectl short name, case-insensitively.
pub fn template_for_kind(kind: &str) -> Option<&'static str> {
    match kind.to_ascii_lowercase().as_str() {
        "persistentvolumeclaim" | "persistentvolumeclaims" | "pvc" => Some(PVC_TEMPLATE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml_ng::Value;

    #[test]
    fn test_pvc_template_is_valid_yaml_with_expected_placeholders() {
        // Arrange / Act
        let doc: Value = serde_yaml_ng::from_str(PVC_TEMPLATE).expect("template must parse");

        // Assert
        assert_eq!(doc["apiVersion"].as_str(), Some("v1"));
        assert_eq!(doc["kind"].as_str(), Some("PersistentVolumeClaim"));
        assert_eq!(doc["metadata"]["name"].as_str(), Some("new-pvc"));
        assert_eq!(doc["spec"]["resources"]["requests"]["storage"].as_str(), Some("8Gi"));
        assert_eq!(doc["spec"]["storageClassName"].as_str(), Some("slow"));
        assert_eq!(
            doc["spec"]["selector"]["matchLabels"]["release"].as_str(),
            Some("stable")
        );
        let expr = &doc["spec"]["selector"]["matchExpressions"][0];
        assert_eq!(expr["key"].as_str(), Some("environment"));
        assert_eq!(expr["operator"].as_str(), Some("In"));
        assert_eq!(expr["values"][0].as_str(), Some("dev"));
    }

    #[test]
    fn test_pvc_template_ends_with_newline() {
        assert!(PVC_TEMPLATE.ends_with('\n'));
        assert!(PVC_TEMPLATE.starts_with("apiVersion: v1\n"));
    }

    #[test]
    fn test_template_for_kind_accepts_kind_and_short_name() {
        assert_eq!(template_for_kind("PersistentVolumeClaim"), Some(PVC_TEMPLATE));
        assert_eq!(template_for_kind("pvc"), Some(PVC_TEMPLATE));
        assert_eq!(template_for_kind("PVC"), Some(PVC_TEMPLATE));
        assert_eq!(template_for_kind("Deployment"), None);
    }
}
