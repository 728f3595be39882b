//! Role assignment and invitation mutations over the GraphQL endpoint.

mod common;

use common::{project, TestApp, TENANT};
use membership_service::models::{RoleSet, User};
use membership_service::services::AuthorizationQuery;

fn assign(user_id: &str, roles: &str) -> String {
    format!(
        r#"mutation {{ assignRoleBindings(tenantId: "{}", entityType: "project", entityId: "acme-proj", input: [{{ userId: "{}", roles: {} }}]) }}"#,
        TENANT, user_id, roles
    )
}

fn invite(email: &str, roles: &str) -> String {
    format!(
        r#"mutation {{ inviteUsersToEntity(tenantId: "{}", entityType: "project", entityId: "acme-proj", input: [{{ email: "{}", roles: {} }}]) }}"#,
        TENANT, email, roles
    )
}

#[tokio::test]
async fn narrowing_roles_emits_one_change() {
    // Arrange
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let user = User::new(TENANT, "u-1", "alice@acme.test");
    app.add_member(&project(), user, "owner,vault");

    // Act
    let body = app.graphql(&assign("u-1", r#"["owner"]"#)).await;

    // Assert
    assert_eq!(body["data"]["assignRoleBindings"], true, "{}", body);
    let roles = app
        .authz
        .roles_for_user(&project(), "u-1")
        .await
        .expect("roles");
    assert_eq!(roles, RoleSet::parse("owner"));

    let changes = app.sink.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].old_roles, RoleSet::parse("owner,vault"));
    assert_eq!(changes[0].new_roles, RoleSet::parse("owner"));

    // Repeating the same assignment changes nothing.
    app.graphql(&assign("u-1", r#"["owner"]"#)).await;
    assert_eq!(app.sink.len(), 1);
}

#[tokio::test]
async fn empty_role_list_rejects_the_batch() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    for roles in [r#"[]"#, r#"[" "]"#] {
        let body = app.graphql(&assign("u-1", roles)).await;
        assert_eq!(
            body["errors"][0]["extensions"]["code"], "BAD_USER_INPUT",
            "roles {} gave {}",
            roles, body
        );
    }

    assert_eq!(app.authz.write_count(), 0);
    assert!(app.sink.is_empty());
}

#[tokio::test]
async fn invite_then_list_then_remove() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    let body = app
        .graphql(&invite("New.Person@Acme.test", r#"["viewer"]"#))
        .await;
    assert_eq!(body["data"]["inviteUsersToEntity"], 1, "{}", body);
    let invites = app.datastore.invites();
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].email, "new.person@acme.test");

    let listing = app
        .graphql(&format!(
            r#"{{ usersOfEntity(tenantId: "{}", entity: {{ entityType: "project", entityId: "acme-proj" }}, showInvitees: true) {{ users {{ user {{ email invitationPending }} }} pageInfo {{ totalCount }} }} }}"#,
            TENANT
        ))
        .await;
    let connection = &listing["data"]["usersOfEntity"];
    assert_eq!(connection["pageInfo"]["totalCount"], 1);
    assert_eq!(connection["users"][0]["user"]["invitationPending"], true);

    let body = app
        .graphql(&format!(
            r#"mutation {{ removeInvite(tenantId: "{}", entityType: "project", entityId: "acme-proj", email: "NEW.PERSON@acme.test") }}"#,
            TENANT
        ))
        .await;
    assert_eq!(body["data"]["removeInvite"], true, "{}", body);
    assert!(app.datastore.invites().is_empty());
}

#[tokio::test]
async fn inviting_an_existing_account_grants_directly() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.datastore
        .add_user(User::new(TENANT, "u-7", "bob@acme.test"));

    let body = app.graphql(&invite("Bob@Acme.test", r#"["editor"]"#)).await;

    assert_eq!(body["data"]["inviteUsersToEntity"], 0, "{}", body);
    assert!(app.datastore.invites().is_empty());
    let roles = app
        .authz
        .roles_for_user(&project(), "u-7")
        .await
        .expect("roles");
    assert_eq!(roles, RoleSet::parse("editor"));
    assert_eq!(app.sink.len(), 1);
}

#[tokio::test]
async fn malformed_email_is_bad_user_input() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    let body = app.graphql(&invite("not-an-email", r#"["viewer"]"#)).await;

    assert_eq!(body["errors"][0]["extensions"]["code"], "BAD_USER_INPUT");
    assert!(app.datastore.invites().is_empty());
}
