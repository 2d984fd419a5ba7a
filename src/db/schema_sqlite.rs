// SQLite schema definitions
// This file mirrors schema.rs but stores timestamps as RFC 3339 text

diesel::table! {
    prefixes (guild_id) {
        guild_id -> Text,
        prefix -> Text,
        updated_at -> Text,
    }
}
