//! Conversion from GitHub wire types to [`RemoteRepository`].

use crate::platform::RemoteRepository;

use super::types::{GraphQlRepository, RestRepository};

/// Convert a REST repository object.
pub fn from_rest(repo: RestRepository) -> RemoteRepository {
    RemoteRepository {
        id: repo.node_id,
        database_id: repo.id,
        name_with_owner: repo.full_name,
        description: repo.description.unwrap_or_default(),
        is_fork: repo.fork,
        url: repo.html_url,
    }
}

/// Convert a GraphQL repository node.
pub fn from_graphql(repo: GraphQlRepository) -> RemoteRepository {
    RemoteRepository {
        id: repo.id,
        database_id: repo.database_id.unwrap_or_default(),
        name_with_owner: repo.name_with_owner,
        description: repo.description.unwrap_or_default(),
        is_fork: repo.is_fork,
        url: repo.url,
    }
}

/// Split `owner/name` into its parts.
///
/// Returns `None` unless there are exactly two non-empty segments.
pub fn split_name_with_owner(name_with_owner: &str) -> Option<(&str, &str)> {
    let (owner, name) = name_with_owner.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rest_defaults_missing_description() {
        let repo = from_rest(RestRepository {
            id: 42,
            node_id: "R_42".to_string(),
            full_name: "acme/widgets".to_string(),
            description: None,
            fork: true,
            html_url: "https://ghe.example.com/acme/widgets".to_string(),
        });

        assert_eq!(repo.id, "R_42");
        assert_eq!(repo.database_id, 42);
        assert_eq!(repo.name_with_owner, "acme/widgets");
        assert_eq!(repo.description, "");
        assert!(repo.is_fork);
    }

    #[test]
    fn test_from_graphql() {
        let repo = from_graphql(GraphQlRepository {
            id: "R_7".to_string(),
            database_id: Some(7),
            name_with_owner: "acme/gadgets".to_string(),
            description: Some("Gadgets".to_string()),
            is_fork: false,
            url: "https://github.com/acme/gadgets".to_string(),
        });

        assert_eq!(repo.database_id, 7);
        assert_eq!(repo.description, "Gadgets");
        assert_eq!(repo.url, "https://github.com/acme/gadgets");
    }

    #[test]
    fn test_split_name_with_owner() {
        assert_eq!(split_name_with_owner("acme/widgets"), Some(("acme", "widgets")));
        assert_eq!(split_name_with_owner("acme"), None);
        assert_eq!(split_name_with_owner("/widgets"), None);
        assert_eq!(split_name_with_owner("acme/"), None);
        assert_eq!(split_name_with_owner("acme/widgets/tree"), None);
    }
}
