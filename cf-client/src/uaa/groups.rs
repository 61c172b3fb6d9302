use super::{Meta, ScimQuery};
use crate::error::{Result, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::ScimPage;
use serde::{Deserialize, Serialize};

const GROUPS: &str = "Groups";
const EXTERNAL: &str = "External";
const MEMBERS: &str = "members";

/// `If-Match` value that matches any version
const ANY_VERSION: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberType {
    User,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub origin: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    /// Id of the user or group
    pub value: String,
    /// The member resource, when requested with `returnEntities`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<serde_json::Value>,
}

impl Member {
    pub fn new(member_type: MemberType, member_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            member_type,
            value: member_id.into(),
            entity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    pub meta: Option<Meta>,
    #[serde(default)]
    pub schemas: Vec<String>,
    pub zone_id: Option<String>,
}

/// Mapping of an external (e.g. LDAP) group onto a UAA group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalGroupMapping {
    pub group_id: String,
    #[serde(alias = "groupDisplayName")]
    pub display_name: Option<String>,
    pub external_group: String,
    #[serde(alias = "originKey")]
    pub origin: String,
    pub meta: Option<Meta>,
    #[serde(default)]
    pub schemas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[serde(skip)]
    pub identity_zone_id: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.display_name, "display name")
    }
}

/// A member in a create or update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    pub origin: String,
    #[serde(rename = "type")]
    pub member_type: MemberType,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    #[serde(skip)]
    pub group_id: String,
    #[serde(skip)]
    pub identity_zone_id: Option<String>,
    /// Expected version; any version when unset
    #[serde(skip)]
    pub version: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<MemberRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

impl UpdateGroupRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.group_id, "group id")?;
        require_non_empty(&self.display_name, "display name")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddMemberRequest {
    pub group_id: String,
    pub identity_zone_id: Option<String>,
    pub member_id: String,
    pub member_type: MemberType,
    pub origin: String,
}

impl AddMemberRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.group_id, "group id")?;
        require_non_empty(&self.member_id, "member id")?;
        require_non_empty(&self.origin, "origin")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListGroupsRequest {
    pub identity_zone_id: Option<String>,
    pub query: ScimQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapExternalGroupRequest {
    pub group_id: String,
    pub external_group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl MapExternalGroupRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.group_id, "group id")?;
        require_non_empty(&self.external_group, "external group")
    }
}

/// Identifies an external group mapping to remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmapExternalGroupRequest {
    pub external_group: String,
    pub origin: String,
}

impl UnmapExternalGroupRequest {
    fn validate(&self) -> Result<()> {
        require_non_empty(&self.external_group, "external group")?;
        require_non_empty(&self.origin, "origin")
    }
}

#[derive(Debug, Clone)]
pub struct Groups {
    ops: Operations,
}

impl Groups {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn add_member(&self, request: &AddMemberRequest) -> Result<Member> {
        request.validate()?;
        let member = MemberRef {
            origin: request.origin.clone(),
            member_type: request.member_type,
            value: request.member_id.clone(),
        };
        self.ops
            .post(
                &[GROUPS, request.group_id.as_str(), MEMBERS],
                Params::new().identity_zone(request.identity_zone_id.as_deref()),
                &member,
            )
            .await
    }

    /// The membership of `member_id`; a `404` error when it is not a member
    pub async fn check_membership(&self, group_id: &str, member_id: &str) -> Result<Member> {
        require_non_empty(group_id, "group id")?;
        require_non_empty(member_id, "member id")?;
        self.ops
            .get(&[GROUPS, group_id, MEMBERS, member_id], Params::new())
            .await
    }

    pub async fn create(&self, request: &CreateGroupRequest) -> Result<Group> {
        request.validate()?;
        self.ops
            .post(
                &[GROUPS],
                Params::new().identity_zone(request.identity_zone_id.as_deref()),
                request,
            )
            .await
    }

    /// Deletes the group if its version matches (`None` matches any version)
    pub async fn delete(&self, group_id: &str, version: Option<&str>) -> Result<Group> {
        require_non_empty(group_id, "group id")?;
        self.ops
            .delete(
                &[GROUPS, group_id],
                Params::new().version(Some(version.unwrap_or(ANY_VERSION))),
            )
            .await?
            .json()
    }

    pub async fn get(&self, group_id: &str) -> Result<Group> {
        require_non_empty(group_id, "group id")?;
        self.ops.get(&[GROUPS, group_id], Params::new()).await
    }

    pub async fn list(&self, request: &ListGroupsRequest) -> Result<ScimPage<Group>> {
        self.ops
            .get(
                &[GROUPS],
                request
                    .query
                    .apply(Params::new().identity_zone(request.identity_zone_id.as_deref())),
            )
            .await
    }

    pub async fn list_external_group_mappings(
        &self,
        query: &ScimQuery,
    ) -> Result<ScimPage<ExternalGroupMapping>> {
        self.ops
            .get(&[GROUPS, EXTERNAL], query.apply(Params::new()))
            .await
    }

    /// Members of the group, with their user or group resources when
    /// `return_entities` is set
    pub async fn list_members(&self, group_id: &str, return_entities: bool) -> Result<Vec<Member>> {
        require_non_empty(group_id, "group id")?;
        self.ops
            .get(
                &[GROUPS, group_id, MEMBERS],
                Params::new().query_opt("returnEntities", return_entities.then_some(true)),
            )
            .await
    }

    pub async fn map_external_group(
        &self,
        request: &MapExternalGroupRequest,
    ) -> Result<ExternalGroupMapping> {
        request.validate()?;
        self.ops
            .post(&[GROUPS, EXTERNAL], Params::new(), request)
            .await
    }

    pub async fn remove_member(&self, group_id: &str, member_id: &str) -> Result<Member> {
        require_non_empty(group_id, "group id")?;
        require_non_empty(member_id, "member id")?;
        self.ops
            .delete(&[GROUPS, group_id, MEMBERS, member_id], Params::new())
            .await?
            .json()
    }

    pub async fn unmap_external_group_by_display_name(
        &self,
        display_name: &str,
        mapping: &UnmapExternalGroupRequest,
    ) -> Result<ExternalGroupMapping> {
        require_non_empty(display_name, "display name")?;
        mapping.validate()?;
        self.unmap("displayName", display_name, mapping).await
    }

    pub async fn unmap_external_group_by_group_id(
        &self,
        group_id: &str,
        mapping: &UnmapExternalGroupRequest,
    ) -> Result<ExternalGroupMapping> {
        require_non_empty(group_id, "group id")?;
        mapping.validate()?;
        self.unmap("groupId", group_id, mapping).await
    }

    async fn unmap(
        &self,
        key: &str,
        value: &str,
        mapping: &UnmapExternalGroupRequest,
    ) -> Result<ExternalGroupMapping> {
        self.ops
            .delete(
                &[
                    GROUPS,
                    EXTERNAL,
                    key,
                    value,
                    "externalGroup",
                    mapping.external_group.as_str(),
                    "origin",
                    mapping.origin.as_str(),
                ],
                Params::new(),
            )
            .await?
            .json()
    }

    pub async fn update(&self, request: &UpdateGroupRequest) -> Result<Group> {
        request.validate()?;
        self.ops
            .put(
                &[GROUPS, request.group_id.as_str()],
                Params::new()
                    .identity_zone(request.identity_zone_id.as_deref())
                    .version(Some(request.version.as_deref().unwrap_or(ANY_VERSION))),
                request,
            )
            .await
    }
}
