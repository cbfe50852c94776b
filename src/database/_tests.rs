#[cfg(test)]
pub mod fixtures {
    use serde_json::json;

    use crate::database::{RegistryCommon, SchemaRegistry};

    /// users (auth), posts, comments, profiles and categories, linked by relations.
    pub fn blog_registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new_registry();
        let collections = json!([
            {
                "id": "_pb_users_",
                "name": "users",
                "type": "auth",
                "schema": [
                    { "name": "name", "type": "text" },
                    { "name": "avatar", "type": "file", "options": { "maxSelect": 1 } },
                    { "name": "friends", "type": "relation", "options": { "collectionId": "_pb_users_" } }
                ]
            },
            {
                "id": "categories_id",
                "name": "categories",
                "type": "base",
                "schema": [
                    { "name": "name", "type": "text" }
                ]
            },
            {
                "id": "posts_id",
                "name": "posts",
                "type": "base",
                "schema": [
                    { "name": "title", "type": "text" },
                    { "name": "views", "type": "number" },
                    { "name": "status", "type": "select", "options": { "maxSelect": 1, "values": ["draft", "public"] } },
                    { "name": "tags", "type": "select", "options": { "maxSelect": 5, "values": ["a", "b", "c"] } },
                    { "name": "attachments", "type": "file", "options": { "maxSelect": 3 } },
                    { "name": "meta", "type": "json" },
                    { "name": "author", "type": "relation", "options": { "collectionId": "_pb_users_", "maxSelect": 1 } },
                    { "name": "categories", "type": "relation", "options": { "collectionId": "categories_id" } },
                    { "name": "broken", "type": "relation", "options": { "maxSelect": 1 } }
                ]
            },
            {
                "id": "comments_id",
                "name": "comments",
                "type": "base",
                "schema": [
                    { "name": "message", "type": "text" },
                    { "name": "post", "type": "relation", "options": { "collectionId": "posts_id", "maxSelect": 1 } },
                    { "name": "author", "type": "relation", "options": { "collectionId": "_pb_users_", "maxSelect": 1 } }
                ]
            },
            {
                "id": "profiles_id",
                "name": "profiles",
                "type": "base",
                "schema": [
                    { "name": "bio", "type": "text" },
                    { "name": "user", "type": "relation", "options": { "collectionId": "_pb_users_", "maxSelect": 1 } }
                ],
                "indexes": ["CREATE UNIQUE INDEX idx_profiles_user ON profiles (user)"]
            }
        ]);
        let _ = registry.load_from_json(collections).unwrap();
        registry
    }
}
