// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! OpenSearch Kubernetes resource builders
//!
//! This module provides functions to build the Kubernetes resources (`Namespace`, `Service`,
//! `ConfigMap`, `Secret`, `StatefulSet`, `Deployment`) that make up an OpenSearch cluster.
//! All functions are pure and easily testable; the subreconcilers decide when to write them.

use crate::constants::{
    API_GROUP_VERSION, DASHBOARDS_CONFIGMAP_NAME, DASHBOARDS_CONFIG_FILE,
    DASHBOARDS_IMAGE_REPOSITORY, DASHBOARDS_PORT, DEFAULT_DISK_SIZE, DEFAULT_JVM_OPTS,
    INIT_HELPER_IMAGE, KIND_OPENSEARCH_CLUSTER, OPENDISTRO_IMAGE_REPOSITORY,
    OPENSEARCH_CONFIG_DIR, OPENSEARCH_CONFIG_FILE, OPENSEARCH_DATA_DIR,
    OPENSEARCH_IMAGE_REPOSITORY, OPENSEARCH_UID, READINESS_FAILURE_THRESHOLD,
    READINESS_INITIAL_DELAY_SECS, READINESS_PERIOD_SECS, READINESS_TIMEOUT_SECS, TLS_CA_KEY,
    TLS_CERT_KEY, TLS_INTERFACE_HTTP, TLS_INTERFACE_TRANSPORT, TLS_KEY_KEY, TRANSPORT_PORT,
    VM_MAX_MAP_COUNT,
};
use crate::crd::{NodePool, OpenSearchCluster, Vendor};
use crate::labels::{
    APP_NAME_DASHBOARDS, APP_NAME_OPENSEARCH, CLUSTER_LABEL, COMPONENT_DASHBOARDS,
    COMPONENT_NODE, K8S_COMPONENT, K8S_INSTANCE, K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF,
    MANAGED_BY_OPERATOR, NODEPOOL_LABEL, PART_OF_OPENSEARCH,
};
use crate::pki::PemPair;
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec},
    core::v1::{
        ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvVar,
        EnvVarSource, HostPathVolumeSource, Namespace, ObjectFieldSelector, PersistentVolumeClaim,
        PersistentVolumeClaimSpec, PodSecurityContext, PodSpec, PodTemplateSpec, Probe, Secret,
        SecretVolumeSource, SecurityContext, Service, ServicePort, ServiceSpec, TCPSocketAction,
        Volume, VolumeMount, VolumeResourceRequirements,
    },
};
use k8s_openapi::apimachinery::pkg::{
    api::resource::Quantity,
    apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference},
    util::intstr::IntOrString,
};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Name of the engine container
const CONTAINER_NAME_OPENSEARCH: &str = "opensearch";

/// Name of the dashboards container
const CONTAINER_NAME_DASHBOARDS: &str = "dashboards";

/// Volume (and claim template) holding node data
const VOLUME_DATA: &str = "data";

/// Volume holding the rendered `opensearch.yml`
const VOLUME_CONFIG: &str = "config";

/// Dashboards configuration directory
const DASHBOARDS_CONFIG_DIR: &str = "/usr/share/opensearch-dashboards/config";

// ============================================================================
// Names
// ============================================================================

/// Namespace all of a cluster's workloads live in.
#[must_use]
pub fn target_namespace(cluster: &OpenSearchCluster) -> String {
    cluster.spec.general.cluster_name.clone()
}

/// Cluster name recorded in status when the workload was first deployed, falling back to
/// the spec before the first phase write.
#[must_use]
pub fn deployed_cluster_name(cluster: &OpenSearchCluster) -> String {
    cluster
        .status
        .as_ref()
        .and_then(|s| s.cluster_name.clone())
        .unwrap_or_else(|| cluster.spec.general.cluster_name.clone())
}

/// `{cluster}-config`
#[must_use]
pub fn config_map_name(cluster: &OpenSearchCluster) -> String {
    format!("{}-config", cluster.spec.general.cluster_name)
}

/// `{cluster}-{component}`
#[must_use]
pub fn statefulset_name(cluster: &OpenSearchCluster, pool: &NodePool) -> String {
    format!("{}-{}", cluster.spec.general.cluster_name, pool.component)
}

/// `{service}-{component}`
#[must_use]
pub fn headless_service_name(cluster: &OpenSearchCluster, pool: &NodePool) -> String {
    format!("{}-{}", cluster.spec.general.service_name, pool.component)
}

/// `{cluster}-dashboards`
#[must_use]
pub fn dashboards_deployment_name(cluster: &OpenSearchCluster) -> String {
    format!("{}-dashboards", cluster.spec.general.cluster_name)
}

/// `{service}-dashboards-svc`
#[must_use]
pub fn dashboards_service_name(cluster: &OpenSearchCluster) -> String {
    format!("{}-dashboards-svc", cluster.spec.general.service_name)
}

/// `{cluster}-ca`
#[must_use]
pub fn ca_secret_name(cluster: &OpenSearchCluster) -> String {
    format!("{}-ca", cluster.spec.general.cluster_name)
}

/// `{cluster}-{iface}-cert`
#[must_use]
pub fn cert_secret_name(cluster: &OpenSearchCluster, interface: &str) -> String {
    format!("{}-{interface}-cert", cluster.spec.general.cluster_name)
}

/// Directory a node certificate is mounted at.
#[must_use]
pub fn tls_mount_path(interface: &str) -> String {
    format!("{OPENSEARCH_CONFIG_DIR}/tls-{interface}")
}

/// DNS names a cluster's node certificates are valid for.
#[must_use]
pub fn certificate_sans(cluster: &OpenSearchCluster) -> Vec<String> {
    let name = &cluster.spec.general.cluster_name;
    let namespace = target_namespace(cluster);
    vec![
        name.clone(),
        format!("{name}.{namespace}"),
        format!("{name}.{namespace}.svc"),
        format!("{name}.{namespace}.svc.cluster.local"),
    ]
}

/// Engine image for a cluster.
#[must_use]
pub fn engine_image(cluster: &OpenSearchCluster) -> String {
    if let Some(image) = &cluster.spec.general.image {
        return image.clone();
    }
    let repository = match cluster.spec.general.vendor.unwrap_or_default() {
        Vendor::Opensearch => OPENSEARCH_IMAGE_REPOSITORY,
        Vendor::Opendistro => OPENDISTRO_IMAGE_REPOSITORY,
    };
    format!("{repository}:{}", cluster.spec.version())
}

// ============================================================================
// Labels and ownership
// ============================================================================

/// Labels shared by everything belonging to a cluster.
#[must_use]
pub fn build_cluster_labels(cluster_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(CLUSTER_LABEL.into(), cluster_name.into());
    labels.insert(K8S_NAME.into(), APP_NAME_OPENSEARCH.into());
    labels.insert(K8S_INSTANCE.into(), cluster_name.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_OPERATOR.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_OPENSEARCH.into());
    labels
}

/// Selector matching every engine node of a cluster.
#[must_use]
pub fn build_cluster_selector(cluster_name: &str) -> BTreeMap<String, String> {
    let mut selector = BTreeMap::new();
    selector.insert(CLUSTER_LABEL.into(), cluster_name.into());
    selector.insert(K8S_COMPONENT.into(), COMPONENT_NODE.into());
    selector
}

/// Selector matching the nodes of one pool. Kept minimal so it never changes.
#[must_use]
pub fn build_node_pool_selector(cluster_name: &str, pool: &NodePool) -> BTreeMap<String, String> {
    let mut selector = build_cluster_selector(cluster_name);
    selector.insert(NODEPOOL_LABEL.into(), pool.component.clone());
    selector
}

/// Full label set of a node pool's pods.
#[must_use]
pub fn build_node_pool_labels(cluster_name: &str, pool: &NodePool) -> BTreeMap<String, String> {
    let mut labels = build_cluster_labels(cluster_name);
    labels.extend(build_node_pool_selector(cluster_name, pool));
    labels
}

fn build_dashboards_selector(cluster_name: &str) -> BTreeMap<String, String> {
    let mut selector = BTreeMap::new();
    selector.insert(CLUSTER_LABEL.into(), cluster_name.into());
    selector.insert(K8S_COMPONENT.into(), COMPONENT_DASHBOARDS.into());
    selector
}

fn build_dashboards_labels(cluster_name: &str) -> BTreeMap<String, String> {
    let mut labels = build_cluster_labels(cluster_name);
    labels.insert(K8S_NAME.into(), APP_NAME_DASHBOARDS.into());
    labels.extend(build_dashboards_selector(cluster_name));
    labels
}

/// Owner references pointing at the cluster descriptor.
///
/// Owner references cannot cross namespaces, so children only get one when the workloads
/// live in the descriptor's own namespace. Teardown deletes the namespace either way.
#[must_use]
pub fn build_owner_references(cluster: &OpenSearchCluster) -> Option<Vec<OwnerReference>> {
    if cluster.namespace().as_deref() != Some(target_namespace(cluster).as_str()) {
        return None;
    }
    Some(vec![OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_OPENSEARCH_CLUSTER.to_string(),
        name: cluster.name_any(),
        uid: cluster.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }])
}

fn build_metadata(
    cluster: &OpenSearchCluster,
    name: &str,
    labels: BTreeMap<String, String>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        namespace: Some(target_namespace(cluster)),
        labels: Some(labels),
        owner_references: build_owner_references(cluster),
        ..Default::default()
    }
}

// ============================================================================
// Namespace and services
// ============================================================================

/// The namespace holding a cluster's workloads.
#[must_use]
pub fn build_namespace(cluster: &OpenSearchCluster) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(target_namespace(cluster)),
            labels: Some(build_cluster_labels(&cluster.spec.general.cluster_name)),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn engine_ports(http_port: i32) -> Vec<ServicePort> {
    vec![
        ServicePort {
            name: Some("http".into()),
            port: http_port,
            target_port: Some(IntOrString::Int(http_port)),
            protocol: Some("TCP".into()),
            ..Default::default()
        },
        ServicePort {
            name: Some("transport".into()),
            port: TRANSPORT_PORT,
            target_port: Some(IntOrString::Int(TRANSPORT_PORT)),
            protocol: Some("TCP".into()),
            ..Default::default()
        },
    ]
}

/// Client-facing service selecting every node of the cluster.
#[must_use]
pub fn build_external_service(cluster: &OpenSearchCluster) -> Service {
    let cluster_name = &cluster.spec.general.cluster_name;
    Service {
        metadata: build_metadata(
            cluster,
            &cluster.spec.general.service_name,
            build_cluster_labels(cluster_name),
        ),
        spec: Some(ServiceSpec {
            selector: Some(build_cluster_selector(cluster_name)),
            ports: Some(engine_ports(cluster.spec.http_port())),
            type_: Some("ClusterIP".into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Headless service giving a pool's pods stable DNS names.
#[must_use]
pub fn build_headless_service(cluster: &OpenSearchCluster, pool: &NodePool) -> Service {
    let cluster_name = &cluster.spec.general.cluster_name;
    Service {
        metadata: build_metadata(
            cluster,
            &headless_service_name(cluster, pool),
            build_node_pool_labels(cluster_name, pool),
        ),
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".into()),
            // Nodes must resolve each other before they are ready to form the cluster.
            publish_not_ready_addresses: Some(true),
            selector: Some(build_node_pool_selector(cluster_name, pool)),
            ports: Some(engine_ports(cluster.spec.http_port())),
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Security plugin defaults appended to every rendered `opensearch.yml`.
#[must_use]
pub fn security_default_lines() -> Vec<String> {
    [
        "plugins.security.allow_default_init_securityindex: true",
        "plugins.security.audit.type: internal_opensearch",
        "plugins.security.enable_snapshot_restore_privilege: true",
        "plugins.security.check_snapshot_restore_write_privileges: true",
        r#"plugins.security.restapi.roles_enabled: ["all_access", "security_rest_api_access"]"#,
        "plugins.security.system_indices.enabled: true",
        r#"plugins.security.system_indices.indices: [".opendistro-alerting-config", ".opendistro-alerting-alert*", ".opendistro-anomaly-results*", ".opendistro-anomaly-detector*", ".opendistro-anomaly-checkpoints", ".opendistro-anomaly-detection-state", ".opendistro-reports-*", ".opendistro-notifications-*", ".opendistro-notebooks", ".opensearch-observability", ".opendistro-asynchronous-search-response*", ".replication-metadata-store"]"#,
    ]
    .iter()
    .map(|line| (*line).to_string())
    .collect()
}

/// `opensearch.yml` lines enabling TLS on one interface with a generated certificate.
#[must_use]
pub fn tls_config_lines(cluster: &OpenSearchCluster, interface: &str) -> Vec<String> {
    let dir = format!("tls-{interface}");
    let cluster_name = &cluster.spec.general.cluster_name;
    let mut lines = vec![
        format!("plugins.security.ssl.{interface}.pemcert_filepath: {dir}/{TLS_CERT_KEY}"),
        format!("plugins.security.ssl.{interface}.pemkey_filepath: {dir}/{TLS_KEY_KEY}"),
        format!("plugins.security.ssl.{interface}.pemtrustedcas_filepath: {dir}/{TLS_CA_KEY}"),
    ];
    match interface {
        TLS_INTERFACE_TRANSPORT => {
            lines.push(
                "plugins.security.ssl.transport.enforce_hostname_verification: false".to_string(),
            );
            lines.push(format!(r#"plugins.security.nodes_dn: ["CN={cluster_name}"]"#));
            lines.push(format!(r#"plugins.security.authcz.admin_dn: ["CN={cluster_name}"]"#));
        }
        TLS_INTERFACE_HTTP => {
            lines.push("plugins.security.ssl.http.enabled: true".to_string());
        }
        _ => {}
    }
    lines
}

/// The rendered `opensearch.yml` config map.
#[must_use]
pub fn build_config_map(cluster: &OpenSearchCluster, fragments: &[String]) -> ConfigMap {
    let mut data = BTreeMap::new();
    data.insert(OPENSEARCH_CONFIG_FILE.to_string(), fragments.join("\n"));
    ConfigMap {
        metadata: build_metadata(
            cluster,
            &config_map_name(cluster),
            build_cluster_labels(&cluster.spec.general.cluster_name),
        ),
        data: Some(data),
        ..Default::default()
    }
}

/// Volume backed by the rendered config map.
#[must_use]
pub fn config_volume(cluster: &OpenSearchCluster) -> Volume {
    Volume {
        name: VOLUME_CONFIG.into(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map_name(cluster),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Mount placing `opensearch.yml` in the engine's config directory without hiding the
/// rest of it.
#[must_use]
pub fn config_volume_mount() -> VolumeMount {
    VolumeMount {
        name: VOLUME_CONFIG.into(),
        mount_path: format!("{OPENSEARCH_CONFIG_DIR}/{OPENSEARCH_CONFIG_FILE}"),
        sub_path: Some(OPENSEARCH_CONFIG_FILE.into()),
        ..Default::default()
    }
}

// ============================================================================
// TLS secrets
// ============================================================================

fn build_tls_secret(
    cluster: &OpenSearchCluster,
    name: &str,
    pair: &PemPair,
    ca_cert_pem: &str,
) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(
        TLS_CERT_KEY.to_string(),
        ByteString(pair.cert_pem.clone().into_bytes()),
    );
    data.insert(
        TLS_KEY_KEY.to_string(),
        ByteString(pair.key_pem.clone().into_bytes()),
    );
    data.insert(
        TLS_CA_KEY.to_string(),
        ByteString(ca_cert_pem.as_bytes().to_vec()),
    );
    Secret {
        metadata: build_metadata(
            cluster,
            name,
            build_cluster_labels(&cluster.spec.general.cluster_name),
        ),
        type_: Some("kubernetes.io/tls".into()),
        data: Some(data),
        ..Default::default()
    }
}

/// Secret holding a cluster's CA.
#[must_use]
pub fn build_ca_secret(cluster: &OpenSearchCluster, ca: &PemPair) -> Secret {
    build_tls_secret(cluster, &ca_secret_name(cluster), ca, &ca.cert_pem)
}

/// Secret holding one interface's node certificate.
#[must_use]
pub fn build_cert_secret(
    cluster: &OpenSearchCluster,
    interface: &str,
    node: &PemPair,
    ca: &PemPair,
) -> Secret {
    build_tls_secret(
        cluster,
        &cert_secret_name(cluster, interface),
        node,
        &ca.cert_pem,
    )
}

/// Read a PEM pair back out of a TLS secret.
#[must_use]
pub fn pem_pair_from_secret(secret: &Secret) -> Option<PemPair> {
    let data = secret.data.as_ref()?;
    let read = |key: &str| {
        data.get(key)
            .and_then(|value| String::from_utf8(value.0.clone()).ok())
    };
    Some(PemPair {
        cert_pem: read(TLS_CERT_KEY)?,
        key_pem: read(TLS_KEY_KEY)?,
    })
}

/// Volume backed by one interface's node certificate secret.
#[must_use]
pub fn tls_volume(cluster: &OpenSearchCluster, interface: &str) -> Volume {
    Volume {
        name: format!("tls-{interface}"),
        secret: Some(SecretVolumeSource {
            secret_name: Some(cert_secret_name(cluster, interface)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Mount of one interface's node certificate.
#[must_use]
pub fn tls_volume_mount(interface: &str) -> VolumeMount {
    VolumeMount {
        name: format!("tls-{interface}"),
        mount_path: tls_mount_path(interface),
        read_only: Some(true),
        ..Default::default()
    }
}

// ============================================================================
// Node pools
// ============================================================================

/// Pod names seeding the first master election: ordinal 0 of each master pool.
#[must_use]
pub fn initial_master_nodes(cluster: &OpenSearchCluster) -> Vec<String> {
    cluster
        .spec
        .node_pools
        .iter()
        .filter(|pool| pool.has_role("master"))
        .map(|pool| format!("{}-0", statefulset_name(cluster, pool)))
        .collect()
}

/// Headless services of the master pools, used as discovery seeds.
#[must_use]
pub fn discovery_seed_hosts(cluster: &OpenSearchCluster) -> Vec<String> {
    cluster
        .spec
        .node_pools
        .iter()
        .filter(|pool| pool.has_role("master"))
        .map(|pool| headless_service_name(cluster, pool))
        .collect()
}

fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        ..Default::default()
    }
}

fn build_engine_env(cluster: &OpenSearchCluster, pool: &NodePool) -> Vec<EnvVar> {
    let mut env = vec![
        env_var("cluster.name", cluster.spec.general.cluster_name.clone()),
        env_var("network.host", "0.0.0.0"),
        env_var("http.port", cluster.spec.http_port().to_string()),
        env_var(
            "OPENSEARCH_JAVA_OPTS",
            pool.jvm.clone().unwrap_or_else(|| DEFAULT_JVM_OPTS.into()),
        ),
        env_var("node.roles", pool.recognised_roles().join(",")),
        env_var(
            "cluster.initial_master_nodes",
            initial_master_nodes(cluster).join(","),
        ),
        env_var("discovery.seed_hosts", discovery_seed_hosts(cluster).join(",")),
        EnvVar {
            name: "node.name".into(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "metadata.name".into(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
    ];
    if cluster.spec.tls().is_some() {
        env.push(env_var("DISABLE_INSTALL_DEMO_CONFIG", "true"));
    }
    env
}

fn build_init_containers(cluster: &OpenSearchCluster) -> Vec<Container> {
    let mut containers = vec![Container {
        name: "init".into(),
        image: Some(INIT_HELPER_IMAGE.into()),
        command: Some(vec![
            "sh".into(),
            "-c".into(),
            format!("chown -R {OPENSEARCH_UID}:{OPENSEARCH_UID} {OPENSEARCH_DATA_DIR}"),
        ]),
        volume_mounts: Some(vec![VolumeMount {
            name: VOLUME_DATA.into(),
            mount_path: OPENSEARCH_DATA_DIR.into(),
            ..Default::default()
        }]),
        security_context: Some(SecurityContext {
            run_as_user: Some(0),
            ..Default::default()
        }),
        ..Default::default()
    }];
    if cluster.spec.general.set_vm_max_map_count {
        containers.push(Container {
            name: "init-sysctl".into(),
            image: Some(INIT_HELPER_IMAGE.into()),
            command: Some(vec![
                "sysctl".into(),
                "-w".into(),
                format!("vm.max_map_count={VM_MAX_MAP_COUNT}"),
            ]),
            security_context: Some(SecurityContext {
                privileged: Some(true),
                run_as_user: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    containers
}

/// Data volume for non-PVC persistence, or `None` when a claim template is used.
fn build_data_volume(pool: &NodePool) -> Option<Volume> {
    let persistence = pool.persistence.as_ref()?;
    if let Some(empty_dir) = &persistence.empty_dir {
        return Some(Volume {
            name: VOLUME_DATA.into(),
            empty_dir: Some(EmptyDirVolumeSource {
                medium: empty_dir.medium.clone(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    if let Some(host_path) = &persistence.host_path {
        return Some(Volume {
            name: VOLUME_DATA.into(),
            host_path: Some(HostPathVolumeSource {
                path: host_path.path.clone(),
                type_: Some("DirectoryOrCreate".into()),
            }),
            ..Default::default()
        });
    }
    None
}

fn build_claim_template(pool: &NodePool) -> PersistentVolumeClaim {
    let pvc = pool.persistence.as_ref().and_then(|p| p.pvc.as_ref());
    let mut requests = BTreeMap::new();
    requests.insert(
        "storage".to_string(),
        Quantity(
            pool.disk_size
                .clone()
                .unwrap_or_else(|| DEFAULT_DISK_SIZE.into()),
        ),
    );
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(VOLUME_DATA.into()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(
                pvc.and_then(|p| p.access_modes.clone())
                    .unwrap_or_else(|| vec!["ReadWriteOnce".into()]),
            ),
            storage_class_name: pvc.and_then(|p| p.storage_class.clone()),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The `StatefulSet` running one node pool.
///
/// `volumes` and `mounts` are the contributions gathered earlier in the pass (TLS
/// certificates, rendered config); the data volume is added here.
#[must_use]
pub fn build_statefulset(
    cluster: &OpenSearchCluster,
    pool: &NodePool,
    volumes: &[Volume],
    mounts: &[VolumeMount],
) -> StatefulSet {
    let cluster_name = &cluster.spec.general.cluster_name;
    let name = statefulset_name(cluster, pool);
    let labels = build_node_pool_labels(cluster_name, pool);
    let http_port = cluster.spec.http_port();
    debug!(name = %name, replicas = pool.replicas, "Building StatefulSet for node pool");

    let mut pod_volumes = volumes.to_vec();
    let data_volume = build_data_volume(pool);
    let claim_templates = if let Some(volume) = data_volume {
        pod_volumes.push(volume);
        None
    } else {
        Some(vec![build_claim_template(pool)])
    };

    let mut volume_mounts = vec![VolumeMount {
        name: VOLUME_DATA.into(),
        mount_path: OPENSEARCH_DATA_DIR.into(),
        ..Default::default()
    }];
    volume_mounts.extend(mounts.iter().cloned());

    let container = Container {
        name: CONTAINER_NAME_OPENSEARCH.into(),
        image: Some(engine_image(cluster)),
        image_pull_policy: Some("IfNotPresent".into()),
        env: Some(build_engine_env(cluster, pool)),
        ports: Some(vec![
            ContainerPort {
                name: Some("http".into()),
                container_port: http_port,
                protocol: Some("TCP".into()),
                ..Default::default()
            },
            ContainerPort {
                name: Some("transport".into()),
                container_port: TRANSPORT_PORT,
                protocol: Some("TCP".into()),
                ..Default::default()
            },
        ]),
        volume_mounts: Some(volume_mounts),
        resources: pool.resources.clone(),
        readiness_probe: Some(Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::Int(http_port),
                ..Default::default()
            }),
            initial_delay_seconds: Some(READINESS_INITIAL_DELAY_SECS),
            period_seconds: Some(READINESS_PERIOD_SECS),
            timeout_seconds: Some(READINESS_TIMEOUT_SECS),
            failure_threshold: Some(READINESS_FAILURE_THRESHOLD),
            ..Default::default()
        }),
        ..Default::default()
    };

    StatefulSet {
        metadata: build_metadata(cluster, &name, labels.clone()),
        spec: Some(StatefulSetSpec {
            replicas: Some(pool.replicas),
            service_name: Some(headless_service_name(cluster, pool)),
            pod_management_policy: Some("Parallel".into()),
            selector: LabelSelector {
                match_labels: Some(build_node_pool_selector(cluster_name, pool)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    init_containers: Some(build_init_containers(cluster)),
                    containers: vec![container],
                    volumes: Some(pod_volumes),
                    security_context: Some(PodSecurityContext {
                        fs_group: Some(OPENSEARCH_UID),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            },
            volume_claim_templates: claim_templates,
            ..Default::default()
        }),
        ..Default::default()
    }
}

// ============================================================================
// Dashboards
// ============================================================================

fn engine_url(cluster: &OpenSearchCluster) -> String {
    let scheme = if cluster.spec.http_tls_enabled() {
        "https"
    } else {
        "http"
    };
    format!(
        "{scheme}://{}.{}.svc.cluster.local:{}",
        cluster.spec.general.service_name,
        target_namespace(cluster),
        cluster.spec.http_port()
    )
}

/// The `opensearch_dashboards.yml` config map.
#[must_use]
pub fn build_dashboards_config_map(cluster: &OpenSearchCluster) -> ConfigMap {
    let cluster_name = &cluster.spec.general.cluster_name;
    let mut lines = vec![
        format!("server.name: {}", dashboards_deployment_name(cluster)),
        r#"server.host: "0.0.0.0""#.to_string(),
        format!(r#"opensearch.hosts: ["{}"]"#, engine_url(cluster)),
        r#"opensearch.requestHeadersWhitelist: ["authorization", "securitytenant"]"#.to_string(),
    ];
    if cluster.spec.http_tls_enabled() {
        lines.push("opensearch.ssl.verificationMode: none".to_string());
    }
    let mut data = BTreeMap::new();
    data.insert(DASHBOARDS_CONFIG_FILE.to_string(), lines.join("\n"));
    ConfigMap {
        metadata: build_metadata(
            cluster,
            DASHBOARDS_CONFIGMAP_NAME,
            build_dashboards_labels(cluster_name),
        ),
        data: Some(data),
        ..Default::default()
    }
}

/// The dashboards `Deployment`.
#[must_use]
pub fn build_dashboards_deployment(cluster: &OpenSearchCluster) -> Deployment {
    let cluster_name = &cluster.spec.general.cluster_name;
    let dashboards = cluster.spec.dashboards.clone().unwrap_or_default();
    let labels = build_dashboards_labels(cluster_name);
    let version = dashboards
        .version
        .clone()
        .unwrap_or_else(|| cluster.spec.version().to_string());

    let container = Container {
        name: CONTAINER_NAME_DASHBOARDS.into(),
        image: Some(format!("{DASHBOARDS_IMAGE_REPOSITORY}:{version}")),
        image_pull_policy: Some("IfNotPresent".into()),
        ports: Some(vec![ContainerPort {
            name: Some("http".into()),
            container_port: DASHBOARDS_PORT,
            protocol: Some("TCP".into()),
            ..Default::default()
        }]),
        env: Some(vec![env_var(
            "OPENSEARCH_HOSTS",
            format!(r#"["{}"]"#, engine_url(cluster)),
        )]),
        volume_mounts: Some(vec![VolumeMount {
            name: VOLUME_CONFIG.into(),
            mount_path: format!("{DASHBOARDS_CONFIG_DIR}/{DASHBOARDS_CONFIG_FILE}"),
            sub_path: Some(DASHBOARDS_CONFIG_FILE.into()),
            ..Default::default()
        }]),
        resources: dashboards.resources.clone(),
        readiness_probe: Some(Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::Int(DASHBOARDS_PORT),
                ..Default::default()
            }),
            initial_delay_seconds: Some(READINESS_INITIAL_DELAY_SECS),
            period_seconds: Some(READINESS_PERIOD_SECS),
            timeout_seconds: Some(READINESS_TIMEOUT_SECS),
            failure_threshold: Some(READINESS_FAILURE_THRESHOLD),
            ..Default::default()
        }),
        ..Default::default()
    };

    Deployment {
        metadata: build_metadata(cluster, &dashboards_deployment_name(cluster), labels.clone()),
        spec: Some(DeploymentSpec {
            replicas: Some(dashboards.replicas.unwrap_or(1)),
            selector: LabelSelector {
                match_labels: Some(build_dashboards_selector(cluster_name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(vec![Volume {
                        name: VOLUME_CONFIG.into(),
                        config_map: Some(ConfigMapVolumeSource {
                            name: DASHBOARDS_CONFIGMAP_NAME.into(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The dashboards `Service`.
#[must_use]
pub fn build_dashboards_service(cluster: &OpenSearchCluster) -> Service {
    let cluster_name = &cluster.spec.general.cluster_name;
    Service {
        metadata: build_metadata(
            cluster,
            &dashboards_service_name(cluster),
            build_dashboards_labels(cluster_name),
        ),
        spec: Some(ServiceSpec {
            selector: Some(build_dashboards_selector(cluster_name)),
            ports: Some(vec![ServicePort {
                name: Some("http".into()),
                port: DASHBOARDS_PORT,
                target_port: Some(IntOrString::Int(DASHBOARDS_PORT)),
                protocol: Some("TCP".into()),
                ..Default::default()
            }]),
            type_: Some("ClusterIP".into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "opensearch_resources_tests.rs"]
mod opensearch_resources_tests;
