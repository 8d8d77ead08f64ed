// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Platform-API capability used by every reconciler.
//!
//! Reconcilers never talk to `kube::Api` directly; they go through [`ObjectStore`], which
//! exposes the handful of verbs they need (get, create, replace, delete, status and
//! metadata patches, namespace lifecycle). [`KubeStore`] is the production implementation.
//! Unit tests swap in an in-memory store.
//!
//! API failures are classified into [`crate::errors::Error`] at this boundary, so callers
//! only ever reason about [`crate::errors::ErrorKind`].

use crate::errors::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

/// Bound satisfied by every namespaced object the operator reads or writes.
pub trait Managed:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> Managed for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Read/write access to the platform's object store.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch an object. A missing object is `Ok(None)`.
    async fn get<K: Managed>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Create an object. An existing object surfaces as [`Error::Conflict`].
    async fn create<K: Managed>(&self, namespace: &str, obj: &K) -> Result<K>;

    /// Replace an object. A stale `resourceVersion` surfaces as [`Error::Conflict`].
    async fn replace<K: Managed>(&self, namespace: &str, obj: &K) -> Result<K>;

    /// Delete an object. A missing object is success.
    async fn delete<K: Managed>(&self, namespace: &str, name: &str) -> Result<()>;

    /// Merge-patch the status subresource.
    async fn patch_status<K: Managed>(
        &self,
        namespace: &str,
        name: &str,
        status: serde_json::Value,
    ) -> Result<()>;

    /// Merge-patch the object (used for metadata: finalizers, annotations).
    async fn patch_merge<K: Managed>(
        &self,
        namespace: &str,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<()>;

    /// Whether a namespace exists.
    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    /// Create a namespace. An existing namespace is success.
    async fn create_namespace(&self, namespace: &Namespace) -> Result<()>;

    /// Delete a namespace and, by cascade, everything in it. A missing namespace is success.
    async fn delete_namespace(&self, name: &str) -> Result<()>;
}

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    /// Wrap a client. Writes are attributed to `field_manager`.
    #[must_use]
    pub fn new(client: Client, field_manager: &str) -> Self {
        Self {
            client,
            field_manager: field_manager.to_string(),
        }
    }

    fn api<K: Managed>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        }
    }
}

fn object_name<K: Managed>(obj: &K) -> Result<String> {
    obj.meta()
        .name
        .clone()
        .ok_or_else(|| Error::Serialization(format!("{} must have a name", K::kind(&()))))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: Managed>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let kind = K::kind(&());
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| Error::from_kube(e, &kind, namespace, name))
    }

    async fn create<K: Managed>(&self, namespace: &str, obj: &K) -> Result<K> {
        let kind = K::kind(&());
        let name = object_name(obj)?;
        debug!(namespace = %namespace, name = %name, kind = %kind, "Creating resource");
        let created = self
            .api::<K>(namespace)
            .create(&self.post_params(), obj)
            .await
            .map_err(|e| Error::from_kube(e, &kind, namespace, &name))?;
        info!("Created {} {}/{}", kind, namespace, name);
        Ok(created)
    }

    async fn replace<K: Managed>(&self, namespace: &str, obj: &K) -> Result<K> {
        let kind = K::kind(&());
        let name = object_name(obj)?;
        debug!(namespace = %namespace, name = %name, kind = %kind, "Replacing resource");
        self.api::<K>(namespace)
            .replace(&name, &self.post_params(), obj)
            .await
            .map_err(|e| Error::from_kube(e, &kind, namespace, &name))
    }

    async fn delete<K: Managed>(&self, namespace: &str, name: &str) -> Result<()> {
        let kind = K::kind(&());
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => {
                info!("Deleted {} {}/{}", kind, namespace, name);
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!("{} {}/{} already gone", kind, namespace, name);
                Ok(())
            }
            Err(e) => Err(Error::from_kube(e, &kind, namespace, name)),
        }
    }

    async fn patch_status<K: Managed>(
        &self,
        namespace: &str,
        name: &str,
        status: serde_json::Value,
    ) -> Result<()> {
        let kind = K::kind(&());
        let patch = serde_json::json!({ "status": status });
        self.api::<K>(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, &kind, namespace, name))?;
        Ok(())
    }

    async fn patch_merge<K: Managed>(
        &self,
        namespace: &str,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<()> {
        let kind = K::kind(&());
        self.api::<K>(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, &kind, namespace, name))?;
        Ok(())
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let found = api
            .get_opt(name)
            .await
            .map_err(|e| Error::from_kube(e, "Namespace", "", name))?;
        Ok(found.is_some())
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let name = namespace.metadata.name.clone().unwrap_or_default();
        match api.create(&self.post_params(), namespace).await {
            Ok(_) => {
                info!("Created Namespace {}", name);
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
            Err(e) => Err(Error::from_kube(e, "Namespace", "", &name)),
        }
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => {
                info!("Deleted Namespace {}", name);
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(Error::from_kube(e, "Namespace", "", name)),
        }
    }
}
