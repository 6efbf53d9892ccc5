//! Reverse-proxy config rendering
//!
//! One nginx `location` block per Service, addressed through cluster DNS.
//! The output is consumed verbatim by an nginx pod that includes every
//! active file in the output directory, so the body must stay stable.

/// Cluster DNS suffix used when none is configured
pub const DEFAULT_CLUSTER_DOMAIN: &str = "svc.cluster.local";

/// Render the proxy config for one Service.
///
/// Pure and infallible: the template has no conditional branches, so any
/// non-empty `service`/`namespace` input produces a valid block. The
/// upstream address is the synthetic in-cluster FQDN
/// `<service>.<namespace>.<cluster_domain>`.
pub fn render(service: &str, namespace: &str, cluster_domain: &str) -> String {
    let fqdn = format!("{service}.{namespace}.{cluster_domain}");

    format!(
        r#"
location /{service} {{
    proxy_pass http://{fqdn};
    proxy_set_header Host $http_host;
    proxy_set_header X-Real-IP $remote_addr;
    proxy_set_header X-Scheme $scheme;
    proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
    proxy_set_header X-Forwarded-Protocol $scheme;
    proxy_set_header X-Forwarded-Proto $scheme;
    # next 3 headers added to support websocket
    proxy_http_version 1.1;
    proxy_set_header Upgrade $http_upgrade;
    proxy_set_header Connection "upgrade";
}}
"#
    )
}
