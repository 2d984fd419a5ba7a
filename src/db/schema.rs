diesel::table! {
    prefixes (guild_id) {
        guild_id -> Text,
        prefix -> Text,
        updated_at -> Timestamptz,
    }
}
