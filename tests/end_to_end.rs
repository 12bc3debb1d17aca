// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin client -> gateway -> license authority, over real sockets.

mod common;

use std::sync::Arc;

use common::{
    authority, authority_with_activation_limit, dev_token, gateway, spawn, ADMIN_EMAIL,
};
use license_control_plane::{
    audit::AuditAction,
    auth::{AdminAllowList, AuthorizationGate, CredentialResolver, TokenVerifier},
    client::{AdminClient, AdminSession, ClientError},
    lifecycle::{
        ActivationRequest, ActivationResponse, ActivationStatus, LatestReleaseResponse,
        LicenseQuery, LicenseStatus, LicenseUpdate, NewLicense, NewRelease, Platform,
        ReleaseUpdate, ReleaseVersion,
    },
};
use serde_json::Value;

struct Stack {
    authority: String,
    client: AdminClient,
    token: String,
}

async fn stack() -> Stack {
    let authority = spawn(authority()).await;
    let gateway = spawn(gateway(&authority)).await;
    Stack {
        authority,
        client: AdminClient::new(gateway),
        token: dev_token(ADMIN_EMAIL),
    }
}

/// Device-side activation, straight to the authority's public endpoint.
async fn activate(authority: &str, key: &str, device: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{authority}/activate"))
        .json(&ActivationRequest {
            license_key: key.to_string(),
            device_fingerprint: device.to_string(),
            app_version: "1.0.0".to_string(),
            device_label: Some(format!("{device} laptop")),
        })
        .send()
        .await
        .unwrap()
}

async fn detail(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["detail"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn license_lifecycle_through_the_gateway() {
    let Stack {
        authority,
        client,
        token,
    } = stack().await;

    let license = client
        .create_license(
            &token,
            &NewLicense {
                customer_name: Some("Acme Corp".to_string()),
                max_activations: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(license.status, LicenseStatus::Active);
    assert_eq!(license.max_activations, 2);

    let found = client
        .list_licenses(
            &token,
            &LicenseQuery {
                search: Some("acme".to_string()),
                status_filter: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, license.id);

    let first = activate(&authority, &license.license_key, "device-a").await;
    assert_eq!(first.status(), 200);
    let first: ActivationResponse = first.json().await.unwrap();
    assert_eq!(first.grace_days, 7);
    assert_eq!(activate(&authority, &license.license_key, "device-b").await.status(), 200);

    // Re-activating a known device does not take another seat.
    assert_eq!(activate(&authority, &license.license_key, "device-a").await.status(), 200);

    let over = activate(&authority, &license.license_key, "device-c").await;
    assert_eq!(over.status(), 409);
    assert_eq!(
        detail(over).await,
        "Maximum activations (2) reached for this license"
    );

    let activations = client.list_activations(&token, &license.id).await.unwrap();
    assert_eq!(activations.len(), 2);

    client
        .revoke_activation(&token, &first.activation.id)
        .await
        .unwrap();
    let revoked_device = activate(&authority, &license.license_key, "device-a").await;
    assert_eq!(revoked_device.status(), 403);
    assert_eq!(activate(&authority, &license.license_key, "device-c").await.status(), 200);

    let activations = client.list_activations(&token, &license.id).await.unwrap();
    let active = activations
        .iter()
        .filter(|a| a.status == ActivationStatus::Active)
        .count();
    assert_eq!(active, 2);

    client.revoke_license(&token, &license.id).await.unwrap();
    client.revoke_license(&token, &license.id).await.unwrap();

    let after = activate(&authority, &license.license_key, "device-b").await;
    assert_eq!(after.status(), 400);
    assert_eq!(detail(after).await, "License has been revoked");

    let err = client
        .update_license(
            &token,
            &license.id,
            &LicenseUpdate {
                status: Some(LicenseStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UpstreamRejected { status: 409, .. }));

    let revoked = client.get_license(&token, &license.id).await.unwrap();
    assert_eq!(revoked.status, LicenseStatus::Revoked);

    let actions: Vec<AuditAction> = client
        .audit_logs(&token, Some(10))
        .await
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::RevokeLicense,
            AuditAction::RevokeActivation,
            AuditAction::CreateLicense
        ]
    );
}

#[tokio::test]
async fn set_latest_keeps_one_latest_per_platform() {
    let Stack {
        authority,
        client,
        token,
    } = stack().await;

    let release = |version: &str, is_latest: bool| NewRelease {
        platform: Platform::default(),
        version: ReleaseVersion::parse(version).unwrap(),
        release_notes: Some(format!("Release {version}")),
        download_url: format!("https://downloads.example.com/app-{version}.msi"),
        is_latest,
    };

    let old = client
        .create_release(&token, &release("1.0.0", true))
        .await
        .unwrap();
    let new = client
        .create_release(&token, &release("1.1.0", false))
        .await
        .unwrap();
    assert!(old.is_latest);
    assert!(!new.is_latest);

    client.set_latest_release(&token, &new.id).await.unwrap();

    let releases = client.list_releases(&token, Some("windows")).await.unwrap();
    let latest: Vec<_> = releases.iter().filter(|r| r.is_latest).collect();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, new.id);

    let check: LatestReleaseResponse = reqwest::Client::new()
        .get(format!(
            "{authority}/releases/latest?platform=windows&current_version=1.0.0"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(check.update_available);
    assert_eq!(check.latest_version.as_deref(), Some("1.1.0"));

    let updated = client
        .update_release(
            &token,
            &old.id,
            &ReleaseUpdate {
                release_notes: Some("Superseded".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.release_notes.as_deref(), Some("Superseded"));
    assert!(!updated.is_latest);

    let err = client
        .set_latest_release(&token, "no-such-release")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::UpstreamRejected { status: 404, .. }));
}

#[tokio::test]
async fn gateway_denies_non_admins() {
    let Stack { client, .. } = stack().await;

    let err = client
        .list_licenses(&dev_token("eve@example.com"), &LicenseQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::AuthorizationDenied);
    assert!(err.requires_sign_in());

    let err = client
        .list_licenses("not-a-token", &LicenseQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::AuthenticationMissing);
}

#[tokio::test]
async fn session_signs_in_and_out() {
    let Stack { client, .. } = stack().await;
    let session = AdminSession::new(
        Arc::new(CredentialResolver::new(TokenVerifier::development())),
        AuthorizationGate::new(AdminAllowList::parse(ADMIN_EMAIL), "/login"),
        client,
    );

    let err = session
        .create_license(&NewLicense::default())
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::AuthenticationMissing);

    session.sign_in(&dev_token(ADMIN_EMAIL)).await.unwrap();
    let license = session.create_license(&NewLicense::default()).await.unwrap();
    assert_eq!(license.max_activations, 1);
    assert_eq!(session.list_licenses(&LicenseQuery::default()).await.unwrap().len(), 1);

    session.sign_out();
    let err = session.get_license(&license.id).await.unwrap_err();
    assert!(err.requires_sign_in());
}

#[tokio::test]
async fn activation_is_rate_limited_per_client_address() {
    let authority = spawn(authority_with_activation_limit(5)).await;
    let client = reqwest::Client::new();
    let attempt = |forwarded_for: Option<&'static str>| {
        let mut request = client.post(format!("{authority}/activate")).json(&ActivationRequest {
            license_key: "unknown-key".to_string(),
            device_fingerprint: "device-a".to_string(),
            app_version: "1.0.0".to_string(),
            device_label: None,
        });
        if let Some(ip) = forwarded_for {
            request = request.header("X-Forwarded-For", ip);
        }
        request.send()
    };

    for _ in 0..5 {
        let response = attempt(Some("203.0.113.7, 10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    let limited = attempt(Some("203.0.113.7")).await.unwrap();
    assert_eq!(limited.status(), 429);
    assert!(limited.headers().contains_key("retry-after"));
    assert_eq!(detail(limited).await, "Rate limit exceeded. Try again later.");

    // Another forwarded client and the direct peer each have their own budget.
    assert_eq!(attempt(Some("198.51.100.2")).await.unwrap().status(), 404);
    assert_eq!(attempt(None).await.unwrap().status(), 404);
}
