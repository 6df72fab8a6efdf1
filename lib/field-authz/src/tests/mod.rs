use std::sync::Arc;

use async_trait::async_trait;
use field_authz_config::authorization::AuthorizationConfig;
use field_authz_config::parse_yaml_config;

use crate::execution::error::ExecutionError;
use crate::execution::executor::ExecutionRequest;
use crate::oracle::{OracleError, PermissionOracle, PermissionOracleChain, StaticPermissionBackend};
use crate::permission::PermissionName;
use crate::principal::{Principal, PrincipalId};
use crate::tests::fixtures::{executor, principal, run, Store};


fn permission(name: &str) -> PermissionName {
    name.parse().unwrap()
}

fn grants(principal: &str, permissions: &[&str]) -> StaticPermissionBackend {
    permissions
        .iter()
        .fold(StaticPermissionBackend::new(), |backend, name| {
            backend.grant(principal, permission(name))
        })
}

fn object_grants(principal: &str, project_ids: &[&str]) -> StaticPermissionBackend {
    project_ids
        .iter()
        .fold(StaticPermissionBackend::new(), |backend, id| {
            backend.grant_object(principal, permission("tests.view_project"), *id)
        })
}

const TWO_PROJECTS_WITH_EXPENSES: &str = r#"
{
  apollo: project(id: "1") { name expenses { id } }
  gemini: project(id: "2") { name expenses { id } }
}
"#;

struct FlakyOracle;

#[async_trait]
impl PermissionOracle for FlakyOracle {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn has_model_permission(
        &self,
        _principal: Option<&PrincipalId>,
        _permission: &PermissionName,
    ) -> Result<bool, OracleError> {
        Err(OracleError::Unavailable {
            backend: "flaky".into(),
            message: "connection reset".into(),
        })
    }
}

#[tokio::test]
async fn model_permissions_return_every_nested_expense() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal(
        "alice",
        grants("alice", &["tests.view_project", "tests.view_expense"]),
    );

    let response = run(&executor, &alice, TWO_PROJECTS_WITH_EXPENSES).await;

    assert!(response.errors.is_empty());
    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"apollo":{"name":"Apollo","expenses":[{"id":"e1"},{"id":"e2"},{"id":"e3"},{"id":"e4"},{"id":"e5"}]},"gemini":{"name":"Gemini","expenses":[{"id":"e6"},{"id":"e7"}]}}}"#
    );
}

#[tokio::test]
async fn missing_expense_permission_empties_nested_lists() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal("alice", grants("alice", &["tests.view_project"]));

    let response = run(&executor, &alice, TWO_PROJECTS_WITH_EXPENSES).await;

    assert!(response.errors.is_empty());
    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"apollo":{"name":"Apollo","expenses":[]},"gemini":{"name":"Gemini","expenses":[]}}}"#
    );
}

#[tokio::test]
async fn denied_non_null_owner_nulls_the_nearest_nullable_parent() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal(
        "alice",
        grants("alice", &["tests.view_project", "tests.view_expense"]),
    );

    let response = run(
        &executor,
        &alice,
        r#"{ expense(id: "e1") { id project { name owner { username } } } }"#,
    )
    .await;

    assert_eq!(response.errors.len(), 1);
    insta::assert_snapshot!(sonic_rs::to_string_pretty(&response).unwrap(), @r#"
    {
      "data": {
        "expense": {
          "id": "e1",
          "project": null
        }
      },
      "errors": [
        {
          "message": "You do not have permission to access this field",
          "path": [
            "expense",
            "project",
            "owner"
          ],
          "extensions": {
            "code": "PERMISSION_DENIED"
          }
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn denied_list_item_reports_its_index() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal(
        "alice",
        grants("alice", &["tests.view_project", "tests.view_expense"]),
    );

    let response = run(
        &executor,
        &alice,
        r#"{ project(id: "2") { name expenses { id owner { username } } } }"#,
    )
    .await;

    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"project":null},"errors":[{"message":"You do not have permission to access this field","path":["project","expenses",0,"owner"],"extensions":{"code":"PERMISSION_DENIED"}}]}"#
    );
}

#[tokio::test]
async fn denied_item_of_nullable_list_is_nulled_in_place() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal(
        "alice",
        grants("alice", &["tests.view_project", "tests.view_expense"]).grant_object(
            "alice",
            permission("auth.view_user"),
            "alice",
        ),
    );

    let response = run(
        &executor,
        &alice,
        r#"{ project(id: "1") { expenseList { id owner { username } } } }"#,
    )
    .await;

    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"project":{"expenseList":[{"id":"e1","owner":{"username":"alice"}},{"id":"e2","owner":{"username":"alice"}},null,{"id":"e4","owner":{"username":"alice"}},null]}},"errors":[{"message":"You do not have permission to access this field","path":["project","expenseList",2,"owner"],"extensions":{"code":"PERMISSION_DENIED"}},{"message":"You do not have permission to access this field","path":["project","expenseList",4,"owner"],"extensions":{"code":"PERMISSION_DENIED"}}]}"#
    );
}

#[tokio::test]
async fn instance_grant_returns_exactly_the_granted_project() {
    let store = Arc::new(Store::default());
    let executor = executor(store.clone(), &AuthorizationConfig::default());
    let bob = principal("bob", object_grants("bob", &["2"]));

    let response = run(&executor, &bob, "{ projects { id name } }").await;

    assert!(response.errors.is_empty());
    assert_eq!(store.fetches(), 1);
    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"projects":[{"id":"2","name":"Gemini"}]}}"#
    );
}

#[tokio::test]
async fn ownership_backend_from_config_returns_owned_projects() {
    let config = parse_yaml_config(
        r#"
authorization:
  backends:
    - type: ownership
      actions: [view]
"#,
    )
    .unwrap();
    let chain = PermissionOracleChain::from_config(&config.authorization.backends).unwrap();
    let executor = executor(Arc::new(Store::default()), &config.authorization);
    let carol = Principal::new("carol", Arc::new(chain));

    let response = run(&executor, &carol, "{ projects { id name } }").await;

    assert!(response.errors.is_empty());
    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"projects":[{"id":"3","name":"Mercury"}]}}"#
    );
}

#[tokio::test]
async fn model_permission_passes_lazy_collection_unfiltered() {
    let store = Arc::new(Store::default());
    let executor = executor(store.clone(), &AuthorizationConfig::default());
    let alice = principal("alice", grants("alice", &["tests.view_project"]));

    let response = run(&executor, &alice, "{ projects { id } }").await;

    assert_eq!(store.fetches(), 1);
    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"projects":[{"id":"1"},{"id":"2"},{"id":"3"}]}}"#
    );
}

#[tokio::test]
async fn plain_list_is_filtered_like_a_lazy_collection() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let dave = principal("dave", object_grants("dave", &["1", "3"]));

    let response = run(&executor, &dave, "{ projects { id } projectList { id } }").await;

    assert!(response.errors.is_empty());
    assert_eq!(
        response.data.get("projects"),
        response.data.get("projectList")
    );
    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"projects":[{"id":"1"},{"id":"3"}],"projectList":[{"id":"1"},{"id":"3"}]}}"#
    );
}

#[tokio::test]
async fn anonymous_principal_sees_nothing() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let anonymous = Principal::anonymous(Arc::new(
        StaticPermissionBackend::new().superuser("admin"),
    ));

    let response = run(
        &executor,
        &anonymous,
        r#"{ project(id: "1") { id } projects { id } projectList { id } }"#,
    )
    .await;

    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"project":null,"projects":[],"projectList":[]}}"#
    );
}

#[tokio::test]
async fn relay_connection_is_built_from_the_filtered_collection() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let dave = principal("dave", object_grants("dave", &["1", "3"]));

    let response = run(
        &executor,
        &dave,
        "{ projectsConnection { totalCount edges { cursor node { id name } } } }",
    )
    .await;

    assert!(response.errors.is_empty());
    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"projectsConnection":{"totalCount":2,"edges":[{"cursor":"project:1","node":{"id":"1","name":"Apollo"}},{"cursor":"project:3","node":{"id":"3","name":"Mercury"}}]}}}"#
    );
}

#[tokio::test]
async fn backend_failure_surfaces_as_field_error() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal("alice", FlakyOracle);

    let response = run(&executor, &alice, r#"{ project(id: "1") { id } }"#).await;

    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"project":null},"errors":[{"message":"Permission backend 'flaky' is unavailable: connection reset","path":["project"],"extensions":{"code":"FIELD_RESOLUTION_ERROR"}}]}"#
    );
}

#[tokio::test]
async fn failure_on_non_null_root_field_nulls_data() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal("alice", FlakyOracle);

    let response = run(&executor, &alice, "{ projectsConnection { totalCount } }").await;

    assert!(response.data.is_null());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].code(), Some("FIELD_RESOLUTION_ERROR"));
}

#[tokio::test]
async fn disabled_authorization_returns_everything() {
    let config = AuthorizationConfig {
        enabled: false,
        ..Default::default()
    };
    let executor = executor(Arc::new(Store::default()), &config);
    let anonymous = Principal::anonymous(Arc::new(StaticPermissionBackend::new()));

    let response = run(
        &executor,
        &anonymous,
        r#"{ project(id: "2") { __typename name owner { username } expenses { amount } } }"#,
    )
    .await;

    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"project":{"__typename":"Project","name":"Gemini","owner":{"username":"bob"},"expenses":[{"amount":60},{"amount":25}]}}}"#
    );
}

#[tokio::test]
async fn superuser_sees_nested_owners() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let admin = principal("admin", StaticPermissionBackend::new().superuser("admin"));

    let response = run(
        &executor,
        &admin,
        r#"{ expense(id: "e3") { amount owner { username } project { owner { username } } } }"#,
    )
    .await;

    insta::assert_snapshot!(
        sonic_rs::to_string(&response).unwrap(),
        @r#"{"data":{"expense":{"amount":45,"owner":{"username":"bob"},"project":{"owner":{"username":"alice"}}}}}"#
    );
}

#[tokio::test]
async fn invalid_queries_are_rejected_before_execution() {
    let executor = executor(Arc::new(Store::default()), &AuthorizationConfig::default());
    let alice = principal("alice", StaticPermissionBackend::new());

    let error = executor
        .execute(&alice, &ExecutionRequest::new("{ project(id: \"1\") { budget } }"))
        .await
        .unwrap_err();

    assert!(matches!(error, ExecutionError::UnknownField { .. }));
}
