use uuid::Uuid;

/// Everything needed to authorize an action on a comment, fetched once per
/// request.
#[derive(Debug, Clone)]
pub struct CommentContext {
    pub comment_author_id: Uuid,
    pub post_author_id: Uuid,
    /// Admin of the group the post belongs to, when it is a group post.
    pub group_admin_id: Option<Uuid>,
}

/// A comment may be deleted by its author, the post's author, or the admin
/// of the group the post was made in.
pub fn can_delete_comment(actor_id: Uuid, context: &CommentContext) -> bool {
    actor_id == context.comment_author_id
        || actor_id == context.post_author_id
        || context.group_admin_id == Some(actor_id)
}
