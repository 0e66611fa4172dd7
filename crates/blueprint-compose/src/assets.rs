//! Asset distribution selector.
//!
//! Always declares one storage bucket. With distribution enabled the
//! bucket is private behind a delegated identity and a global
//! distribution; with hosting alone it is a public-read website.

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use blueprint_core::config::AssetsConfig;
use blueprint_core::resource::{
    AccessIdentityProps, AssetDeploymentProps, BucketAccess, BucketProps, CertificateProps,
    DistributionProps, ErrorResponse, MetricRef, ResourceProps, WebsiteConfig,
};
use blueprint_core::{ConfigResult, ResourceRef, Token};

use crate::stack::Scope;

pub const INDEX_DOCUMENT: &str = "index.html";
pub const ERROR_DOCUMENT: &str = "error.html";
/// Cache lifetime for rewritten not-found/forbidden responses.
pub const ERROR_RESPONSE_TTL_SECS: u32 = 300;

/// Access-control mode chosen for the storage bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Private,
    PublicRead,
    DistributionOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionMetrics {
    pub requests: MetricRef,
    pub client_error_rate: MetricRef,
    pub server_error_rate: MetricRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionHandle {
    pub resource: ResourceRef,
    pub identity: ResourceRef,
    pub certificate: Option<ResourceRef>,
    /// Custom domain alias, only when a certificate backs it.
    pub domain: Option<String>,
    pub metrics: DistributionMetrics,
}

impl DistributionHandle {
    pub fn domain_name(&self) -> Token {
        self.resource.attr("DomainName")
    }

    /// Effective address clients reach the site through.
    pub fn url(&self) -> Token {
        match &self.domain {
            Some(domain) => Token::literal(format!("https://{domain}")),
            None => Token::join([Token::literal("https://"), self.domain_name()]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assets {
    pub storage: ResourceRef,
    pub bucket_name: String,
    pub access: AccessMode,
    pub hosting: bool,
    pub distribution: Option<DistributionHandle>,
    pub seed: ResourceRef,
}

impl Assets {
    /// Public site address, if the bucket is reachable at all.
    pub fn site_url(&self) -> Option<Token> {
        match (&self.distribution, self.hosting) {
            (Some(distribution), _) => Some(distribution.url()),
            (None, true) => Some(self.storage.attr("WebsiteURL")),
            (None, false) => None,
        }
    }
}

/// Declare the storage bucket and, when enabled, its distribution.
pub fn provision(spec: &AssetsConfig, scope: &mut Scope) -> ConfigResult<Assets> {
    let env = scope.environment;
    let bucket_name = scope.namer.physical("assets");

    let identity = if spec.distribution {
        Some(scope.graph.add(
            "AssetsAccessIdentity",
            ResourceProps::AccessIdentity(AccessIdentityProps {
                comment: format!("delegated read access to {bucket_name}"),
            }),
        )?)
    } else {
        None
    };

    let (access, bucket_access) = match (&identity, spec.hosting) {
        (Some(identity), _) => (
            AccessMode::DistributionOnly,
            BucketAccess::DistributionOnly {
                identity: identity.token(),
            },
        ),
        (None, true) => (AccessMode::PublicRead, BucketAccess::PublicRead),
        (None, false) => (AccessMode::Private, BucketAccess::Private),
    };

    // Website endpoints only serve public buckets.
    let website = (access == AccessMode::PublicRead).then(|| WebsiteConfig {
        index_document: INDEX_DOCUMENT.to_string(),
        error_document: ERROR_DOCUMENT.to_string(),
    });

    let storage = scope.graph.add(
        "AssetsBucket",
        ResourceProps::Bucket(BucketProps {
            bucket_name: bucket_name.clone(),
            access: bucket_access,
            website,
            removal_policy: env.removal_policy(),
            auto_delete_objects: env.auto_delete_objects(),
        }),
    )?;

    let distribution = match identity {
        Some(identity) => Some(declare_distribution(spec, &storage, identity, scope)?),
        None => None,
    };

    let seed = seed_placeholder(&storage, distribution.as_ref(), scope)?;

    info!(
        bucket = %bucket_name,
        access = ?access,
        distribution = distribution.is_some(),
        "provisioned asset storage"
    );

    Ok(Assets {
        storage,
        bucket_name,
        access,
        hosting: spec.hosting,
        distribution,
        seed,
    })
}

fn declare_distribution(
    spec: &AssetsConfig,
    storage: &ResourceRef,
    identity: ResourceRef,
    scope: &mut Scope,
) -> ConfigResult<DistributionHandle> {
    let (domain, certificate) = match &spec.domain {
        Some(domain) => match &domain.certificate_arn {
            Some(arn) => {
                let certificate = scope.graph.add(
                    "AssetsCertificate",
                    ResourceProps::Certificate(CertificateProps {
                        certificate_arn: arn.clone(),
                    }),
                )?;
                (Some(domain.name.clone()), Some(certificate))
            }
            None => {
                warn!(
                    domain = %domain.name,
                    "custom domain has no certificate reference; serving on the default domain"
                );
                (None, None)
            }
        },
        None => (None, None),
    };

    let error_responses = [403, 404]
        .into_iter()
        .map(|status| ErrorResponse {
            http_status: status,
            response_status: 200,
            response_page_path: format!("/{INDEX_DOCUMENT}"),
            ttl_secs: ERROR_RESPONSE_TTL_SECS,
        })
        .collect();

    let resource = scope.graph.add(
        "AssetsDistribution",
        ResourceProps::Distribution(DistributionProps {
            comment: scope.namer.physical("distribution"),
            origin_bucket: storage.token(),
            origin_identity: identity.token(),
            default_root_object: INDEX_DOCUMENT.to_string(),
            viewer_protocol_policy: "redirect-to-https".to_string(),
            error_responses,
            domain_names: domain.iter().cloned().collect(),
            certificate: certificate.as_ref().map(ResourceRef::token),
        }),
    )?;

    debug!(domain = ?domain, "declared distribution");

    let metric = |name: &str, statistic: &str| {
        MetricRef::new("AWS/CloudFront", name, statistic)
            .with_dimension("DistributionId", resource.token())
            .with_dimension("Region", Token::literal("Global"))
    };
    let metrics = DistributionMetrics {
        requests: metric("Requests", "Sum"),
        client_error_rate: metric("4xxErrorRate", "Average"),
        server_error_rate: metric("5xxErrorRate", "Average"),
    };

    Ok(DistributionHandle {
        resource,
        identity,
        certificate,
        domain,
        metrics,
    })
}

/// Placeholder page uploaded at composition time. The content digest keys
/// the deployment, so redeploying identical content changes nothing.
fn seed_placeholder(
    storage: &ResourceRef,
    distribution: Option<&DistributionHandle>,
    scope: &mut Scope,
) -> ConfigResult<ResourceRef> {
    let body = placeholder_page(scope.namer.prefix());
    let digest = hex::encode(Sha256::digest(body.as_bytes()));

    scope.graph.add(
        "AssetsSeed",
        ResourceProps::AssetDeployment(AssetDeploymentProps {
            bucket: storage.token(),
            key: INDEX_DOCUMENT.to_string(),
            content_type: "text/html; charset=utf-8".to_string(),
            content_sha256: digest,
            size_bytes: body.len(),
            invalidate: distribution.map(|d| d.resource.token()),
        }),
    )
}

fn placeholder_page(title: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body><h1>{title}</h1><p>Deployed. Replace this page with your build output.</p></body>\n\
         </html>\n"
    )
}
