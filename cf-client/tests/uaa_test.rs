mod common;

use cf_client::ClientError;
use cf_client::uaa::ScimQuery;
use cf_client::uaa::groups::{
    AddMemberRequest, CreateGroupRequest, ListGroupsRequest, MemberType, UnmapExternalGroupRequest,
    UpdateGroupRequest,
};
use cf_client::uaa::tokens::{ClientCredentials, TokenFormat};
use cf_stub_server::{Interaction, StubResponse};
use reqwest::Method;
use serde_json::json;

fn group_body(id: &str, version: u32) -> serde_json::Value {
    json!({
        "id": id,
        "displayName": "test-group",
        "description": "test-description",
        "zoneId": "test-zone",
        "members": [{ "origin": "uaa", "type": "USER", "value": "user-1" }],
        "schemas": ["urn:scim:schemas:core:1.0"],
        "meta": {
            "version": version,
            "created": "2016-06-03T17:59:30.527Z",
            "lastModified": "2016-06-03T17:59:30.561Z"
        }
    })
}

fn token_body() -> serde_json::Value {
    json!({
        "access_token": "access-token",
        "token_type": "bearer",
        "refresh_token": "refresh-token",
        "expires_in": 43199,
        "scope": "clients.read openid",
        "jti": "jti-1"
    })
}

#[tokio::test]
async fn test_create_group_sends_zone_header() {
    let stub = common::stub(vec![Interaction::post(
        "/Groups",
        StubResponse::json(201, group_body("group-1", 0)),
    )])
    .await;
    let uaa = common::uaa(&stub, Vec::new());

    let group = uaa
        .groups()
        .create(&CreateGroupRequest {
            identity_zone_id: Some("test-zone".into()),
            display_name: "test-group".into(),
            description: Some("test-description".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(group.id, "group-1");
    assert_eq!(group.members[0].member_type, MemberType::User);

    let requests = stub.requests_to(Method::POST, "/Groups");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.header("X-Identity-Zone-Id"), Some("test-zone"));
    assert_eq!(
        request.header("Authorization"),
        Some(format!("bearer {}", common::TOKEN).as_str())
    );
    assert_eq!(
        request.json().unwrap(),
        json!({ "displayName": "test-group", "description": "test-description" })
    );
}

#[tokio::test]
async fn test_update_and_delete_send_if_match() {
    let stub = common::stub(vec![
        Interaction::put("/Groups/group-1", StubResponse::json(200, group_body("group-1", 2))),
        Interaction::delete("/Groups/group-1", StubResponse::json(200, group_body("group-1", 2))),
    ])
    .await;
    let uaa = common::uaa(&stub, Vec::new());

    uaa.groups()
        .update(&UpdateGroupRequest {
            group_id: "group-1".into(),
            version: Some("1".into()),
            display_name: "test-group".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let deleted = uaa.groups().delete("group-1", None).await.unwrap();
    assert_eq!(deleted.meta.and_then(|meta| meta.version), Some(2));

    let update = &stub.requests_to(Method::PUT, "/Groups/group-1")[0];
    assert_eq!(update.header("If-Match"), Some("1"));
    assert_eq!(update.json().unwrap()["members"], json!([]));
    let delete = &stub.requests_to(Method::DELETE, "/Groups/group-1")[0];
    assert_eq!(delete.header("If-Match"), Some("*"));
}

#[tokio::test]
async fn test_list_groups_with_scim_query() {
    let stub = common::stub(vec![Interaction::get(
        "/Groups?filter=displayName+eq+%22test-group%22&startIndex=1&count=10",
        StubResponse::json(
            200,
            json!({
                "resources": [group_body("group-1", 0)],
                "startIndex": 1,
                "itemsPerPage": 10,
                "totalResults": 1,
                "schemas": ["urn:scim:schemas:core:1.0"]
            }),
        ),
    )])
    .await;
    let uaa = common::uaa(&stub, Vec::new());

    let page = uaa
        .groups()
        .list(&ListGroupsRequest {
            identity_zone_id: None,
            query: ScimQuery {
                filter: Some("displayName eq \"test-group\"".into()),
                start_index: Some(1),
                count: Some(10),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(page.total_results, 1);
    assert_eq!(page.resources[0].display_name, "test-group");
}

#[tokio::test]
async fn test_members() {
    let member = json!({ "origin": "uaa", "type": "USER", "value": "user-1" });
    let stub = common::stub(vec![
        Interaction::post("/Groups/group-1/members", StubResponse::json(201, member.clone())),
        Interaction::get(
            "/Groups/group-1/members?returnEntities=true",
            StubResponse::json(200, json!([member])),
        ),
        Interaction::get("/Groups/group-1/members/user-1", StubResponse::json(200, member.clone())),
        Interaction::delete("/Groups/group-1/members/user-1", StubResponse::json(200, member)),
    ])
    .await;
    let groups = common::uaa(&stub, Vec::new()).groups();

    let added = groups
        .add_member(&AddMemberRequest {
            group_id: "group-1".into(),
            identity_zone_id: None,
            member_id: "user-1".into(),
            member_type: MemberType::User,
            origin: "uaa".into(),
        })
        .await
        .unwrap();
    assert_eq!(added.value, "user-1");
    assert_eq!(groups.list_members("group-1", true).await.unwrap().len(), 1);
    assert_eq!(
        groups.check_membership("group-1", "user-1").await.unwrap().origin,
        "uaa"
    );
    groups.remove_member("group-1", "user-1").await.unwrap();

    let add = &stub.requests_to(Method::POST, "/Groups/group-1/members")[0];
    assert_eq!(
        add.json().unwrap(),
        json!({ "origin": "uaa", "type": "USER", "value": "user-1" })
    );
    assert!(add.header("X-Identity-Zone-Id").is_none());
}

#[tokio::test]
async fn test_check_membership_not_found() {
    let stub = common::stub(vec![Interaction::get(
        "/Groups/group-1/members/user-2",
        StubResponse::json(
            404,
            json!({ "error": "scim_resource_not_found", "error_description": "Member user-2 does not exist" }),
        ),
    )])
    .await;

    let error = common::uaa(&stub, Vec::new())
        .groups()
        .check_membership("group-1", "user-2")
        .await
        .unwrap_err();
    match error {
        ClientError::Uaa {
            status,
            error,
            error_description,
            ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(error, "scim_resource_not_found");
            assert_eq!(error_description, "Member user-2 does not exist");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_external_group_mappings() {
    let mapping = json!({
        "groupId": "group-1",
        "displayName": "test-group",
        "externalGroup": "cn=test,ou=groups",
        "origin": "ldap",
        "meta": { "version": 0 },
        "schemas": ["urn:scim:schemas:core:1.0"]
    });
    let stub = common::stub(vec![
        Interaction::get(
            "/Groups/External?filter=origin+eq+%22ldap%22",
            StubResponse::json(
                200,
                json!({
                    "resources": [{
                        "groupId": "group-1",
                        "groupDisplayName": "test-group",
                        "externalGroup": "cn=test,ou=groups",
                        "originKey": "ldap"
                    }],
                    "startIndex": 1,
                    "itemsPerPage": 100,
                    "totalResults": 1
                }),
            ),
        ),
        Interaction::delete(
            "/Groups/External/displayName/test%20group/externalGroup/cn=test,ou=groups/origin/ldap",
            StubResponse::json(200, mapping.clone()),
        ),
        Interaction::delete(
            "/Groups/External/groupId/group-1/externalGroup/cn=test,ou=groups/origin/ldap",
            StubResponse::json(200, mapping),
        ),
    ])
    .await;
    let groups = common::uaa(&stub, Vec::new()).groups();

    let page = groups
        .list_external_group_mappings(&ScimQuery {
            filter: Some("origin eq \"ldap\"".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.resources[0].display_name.as_deref(), Some("test-group"));
    assert_eq!(page.resources[0].origin, "ldap");

    let unmap = UnmapExternalGroupRequest {
        external_group: "cn=test,ou=groups".into(),
        origin: "ldap".into(),
    };
    let by_name = groups
        .unmap_external_group_by_display_name("test group", &unmap)
        .await
        .unwrap();
    let by_id = groups
        .unmap_external_group_by_group_id("group-1", &unmap)
        .await
        .unwrap();
    assert_eq!(by_name, by_id);
}

#[tokio::test]
async fn test_password_grant_posts_form() {
    let stub = common::stub(vec![Interaction::post(
        "/oauth/token",
        StubResponse::json(200, token_body()),
    )])
    .await;
    let uaa = common::uaa(&stub, Vec::new());

    let token = uaa
        .tokens()
        .get_by_password(
            &ClientCredentials::new("cf", "secret"),
            "admin",
            "p@ss word",
            TokenFormat::Opaque,
        )
        .await
        .unwrap();
    assert_eq!(token.access_token, "access-token");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-token"));

    let request = &stub.requests_to(Method::POST, "/oauth/token")[0];
    assert!(request.query.is_none());
    assert!(request.header("Authorization").is_none());
    assert_eq!(
        request.header("Content-Type"),
        Some("application/x-www-form-urlencoded")
    );
    let body = request.body_text();
    for pair in [
        "grant_type=password",
        "client_id=cf",
        "client_secret=secret",
        "response_type=token",
        "token_format=opaque",
        "username=admin",
        "password=p%40ss+word",
    ] {
        assert!(body.split('&').any(|p| p == pair), "{pair} missing from {body}");
    }
}

#[tokio::test]
async fn test_refresh_and_authorization_code_grants() {
    let stub = common::stub(vec![Interaction::post(
        "/oauth/token",
        StubResponse::json(200, token_body()),
    )])
    .await;
    let tokens = common::uaa(&stub, Vec::new()).tokens();
    let credentials = ClientCredentials::new("cf", "secret");

    tokens
        .refresh(&credentials, "refresh-token", TokenFormat::Jwt)
        .await
        .unwrap();
    tokens
        .get_by_authorization_code(&credentials, "code-1", Some("https://app/callback"), TokenFormat::Jwt)
        .await
        .unwrap();
    tokens
        .get_by_client_credentials(&credentials, TokenFormat::Jwt)
        .await
        .unwrap();

    let bodies: Vec<String> = stub
        .requests_to(Method::POST, "/oauth/token")
        .iter()
        .map(|request| request.body_text())
        .collect();
    assert!(bodies[0].contains("grant_type=refresh_token"));
    assert!(bodies[0].contains("refresh_token=refresh-token"));
    assert!(bodies[1].contains("grant_type=authorization_code"));
    assert!(bodies[1].contains("code=code-1"));
    assert!(bodies[1].contains("redirect_uri=https%3A%2F%2Fapp%2Fcallback"));
    assert!(bodies[2].contains("grant_type=client_credentials"));
}

#[tokio::test]
async fn test_token_validation_is_local() {
    let stub = common::stub(Vec::new()).await;
    let tokens = common::uaa(&stub, Vec::new()).tokens();

    let error = tokens
        .get_by_password(&ClientCredentials::new("cf", "secret"), "", "pw", TokenFormat::Jwt)
        .await
        .unwrap_err();
    assert!(matches!(error, ClientError::Validation(message) if message == "username must be specified"));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_check_token_uses_basic_auth() {
    let stub = common::stub(vec![Interaction::post(
        "/check_token",
        StubResponse::json(
            200,
            json!({
                "aud": ["cloud_controller"],
                "client_id": "cf",
                "scope": ["cloud_controller.read"],
                "user_name": "admin",
                "exp": 1_467_000_000u64
            }),
        ),
    )])
    .await;

    let claims = common::uaa(&stub, Vec::new())
        .tokens()
        .check(
            &ClientCredentials::new("app", "appclientsecret"),
            "access-token",
            &["cloud_controller.read".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(claims.user_name.as_deref(), Some("admin"));

    let request = &stub.requests_to(Method::POST, "/check_token")[0];
    // base64("app:appclientsecret")
    assert_eq!(
        request.header("Authorization"),
        Some("Basic YXBwOmFwcGNsaWVudHNlY3JldA==")
    );
    assert!(request.body_text().contains("token=access-token"));
}

#[tokio::test]
async fn test_token_keys_and_rate_limit_status() {
    let stub = common::stub(vec![
        Interaction::get(
            "/token_keys",
            StubResponse::json(
                200,
                json!({ "keys": [{ "kid": "key-1", "alg": "RS256", "kty": "RSA", "use": "sig", "e": "AQAB" }] }),
            ),
        ),
        Interaction::get(
            "/RateLimitingStatus",
            StubResponse::json(
                200,
                json!({ "status": { "current": { "status": "ACTIVE", "limiterMappings": 3 } } }),
            ),
        ),
    ])
    .await;
    let uaa = common::uaa(&stub, Vec::new());

    let keys = uaa.tokens().list_keys().await.unwrap();
    assert_eq!(keys.keys[0].key_use.as_deref(), Some("sig"));
    assert!(stub.requests_to(Method::GET, "/token_keys")[0]
        .header("Authorization")
        .is_none());

    let status = uaa.rate_limit().get_status().await.unwrap();
    assert!(status.is_active());
    assert_eq!(status.status.current.limiter_mappings, Some(3));
}
