// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the CRD types.

#[cfg(test)]
mod tests {
    use crate::constants::{API_GROUP, API_GROUP_VERSION, LEGACY_API_GROUP, LEGACY_API_GROUP_VERSION};
    use crate::crd::*;
    use kube::{CustomResourceExt, Resource};
    use serde_json::json;

    fn cluster_yaml() -> &'static str {
        r"
apiVersion: opensearch.org/v1
kind: OpenSearchCluster
metadata:
  name: c1
  namespace: c1
spec:
  general:
    clusterName: c1
    serviceName: es-svc
    version: 2.11.1
    setVMMaxMapCount: true
  nodePools:
    - component: masters
      replicas: 3
      diskSize: 30Gi
      roles: [master, data]
      persistence:
        emptyDir: {}
  security:
    tls:
      transport:
        generate: true
      http:
        generate: true
  dashboards:
    enable: true
    replicas: 2
"
    }

    #[test]
    fn test_cluster_descriptor_parses() {
        let cluster: OpenSearchCluster = serde_yaml::from_str(cluster_yaml()).expect("valid yaml");

        assert_eq!(cluster.spec.general.cluster_name, "c1");
        assert_eq!(cluster.spec.general.service_name, "es-svc");
        assert!(cluster.spec.general.set_vm_max_map_count);
        let pool = &cluster.spec.node_pools[0];
        assert_eq!(pool.replicas, 3);
        assert_eq!(pool.disk_size.as_deref(), Some("30Gi"));
        assert!(pool
            .persistence
            .as_ref()
            .is_some_and(|p| p.empty_dir.is_some()));
        assert!(cluster.spec.http_tls_enabled());
        assert!(cluster.spec.dashboards_enabled());
        assert!(cluster.status.is_none());
    }

    #[test]
    fn test_spec_defaults() {
        let spec = OpenSearchClusterSpec {
            general: GeneralConfig {
                cluster_name: "c1".to_string(),
                service_name: "es-svc".to_string(),
                ..Default::default()
            },
            node_pools: vec![],
            security: None,
            dashboards: None,
        };

        assert_eq!(spec.version(), crate::constants::DEFAULT_OPENSEARCH_VERSION);
        assert_eq!(spec.http_port(), crate::constants::DEFAULT_HTTP_PORT);
        assert!(spec.tls().is_none());
        assert!(!spec.http_tls_enabled());
        assert!(!spec.dashboards_enabled());
    }

    #[test]
    fn test_tls_interface_lookup() {
        let tls = TlsConfig {
            transport: Some(TlsInterfaceConfig {
                generate: true,
                ..Default::default()
            }),
            http: None,
        };

        assert!(tls.interface("transport").is_some_and(|t| t.generate));
        assert!(tls.interface("http").is_none());
        assert!(tls.interface("admin").is_none());
    }

    #[test]
    fn test_recognised_roles_filter_unknown_entries() {
        let pool = NodePool {
            component: "mixed".to_string(),
            replicas: 1,
            roles: vec!["master".to_string(), "ml".to_string(), "ingest".to_string()],
            ..Default::default()
        };

        assert_eq!(pool.recognised_roles(), vec!["master", "ingest"]);
        assert!(pool.has_role("ml"));
        assert!(!pool.has_role("data"));
    }

    #[test]
    fn test_status_wire_format() {
        let status = ClusterStatus {
            phase: Some(ClusterPhase::Running),
            components_status: vec![ComponentStatus::new("Scaler", "Excluded", "Group-0")],
            observed_generation: None,
            cluster_name: None,
        };

        let value = serde_json::to_value(&status).expect("serializable");

        assert_eq!(
            value,
            json!({
                "phase": "RUNNING",
                "componentsStatus": [
                    { "component": "Scaler", "status": "Excluded", "description": "Group-0" }
                ]
            })
        );
        assert_eq!(ClusterPhase::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_cluster_name_is_immutable_in_both_groups() {
        for crd in [OpenSearchCluster::crd(), legacy::OpenSearchCluster::crd()] {
            // Arrange
            let crd = serde_json::to_value(&crd).expect("serializable");

            // Act
            let rules = &crd["spec"]["versions"][0]["schema"]["openAPIV3Schema"]["properties"]
                ["spec"]["properties"]["general"]["properties"]["clusterName"]
                ["x-kubernetes-validations"];

            // Assert
            assert_eq!(
                rules,
                &json!([{ "rule": "self == oldSelf", "message": "clusterName is immutable" }])
            );
        }
    }

    #[test]
    fn test_vendor_is_lowercase_on_the_wire() {
        let general: GeneralConfig = serde_json::from_value(json!({
            "clusterName": "c1",
            "serviceName": "es-svc",
            "vendor": "opendistro"
        }))
        .expect("valid general block");

        assert_eq!(general.vendor, Some(Vendor::Opendistro));
    }

    #[test]
    fn test_both_groups_serve_the_same_kinds() {
        assert_eq!(OpenSearchCluster::group(&()), API_GROUP);
        assert_eq!(legacy::OpenSearchCluster::group(&()), LEGACY_API_GROUP);
        assert_eq!(OpenSearchCluster::api_version(&()), API_GROUP_VERSION);
        assert_eq!(
            legacy::OpenSearchCluster::api_version(&()),
            LEGACY_API_GROUP_VERSION
        );
        assert_eq!(
            OpensearchSnapshotPolicy::kind(&()),
            legacy::OpensearchSnapshotPolicy::kind(&())
        );
        assert_eq!(
            OpenSearchCluster::crd().spec.names.plural,
            legacy::OpenSearchCluster::crd().spec.names.plural
        );
    }

    #[test]
    fn test_legacy_spec_has_the_same_shape() {
        let current: OpenSearchCluster = serde_yaml::from_str(cluster_yaml()).expect("valid yaml");
        let spec = serde_json::to_value(&current.spec).expect("serializable");

        let legacy_spec: legacy::OpenSearchClusterSpec =
            serde_json::from_value(spec.clone()).expect("legacy accepts the same spec");

        assert_eq!(serde_json::to_value(&legacy_spec).expect("serializable"), spec);
    }

    #[test]
    fn test_action_group_type_field_is_renamed() {
        let spec: OpensearchActionGroupSpec = serde_json::from_value(json!({
            "opensearchCluster": { "name": "c1" },
            "allowedActions": ["indices:data/read/*"],
            "type": "index"
        }))
        .expect("valid action group");

        assert_eq!(spec.group_type.as_deref(), Some("index"));
        assert_eq!(spec.opensearch_cluster.name, "c1");
    }
}
