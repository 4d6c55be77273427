// crud-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `crud-gate.toml`. It parses and validates as-is, so it
//! doubles as a starting point for new deployments.

/// Returns a canonical example `crud-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"secret_env = "CRUD_GATE_SECRET"

# Public reads of published posts.
[crud.mongo.collections.posts.rules.read]
rule = "allow"

# Authors may only create posts under their own id.
[crud.mongo.collections.posts.rules.create]
rule = "match"
eval = "=="
type = "string"
f1 = "args.auth.id"
f2 = "args.doc.author"

# Users may only read their own documents.
[crud.mongo.collections.users.rules.read]
rule = "match"
eval = "=="
type = "string"
f1 = "args.auth.id"
f2 = "args.find.owner"

# Deletes require the owner or an admin.
[crud.mongo.collections.users.rules.delete]
rule = "or"

[[crud.mongo.collections.users.rules.delete.clauses]]
rule = "match"
eval = "=="
type = "string"
f1 = "args.auth.id"
f2 = "args.find.owner"

[[crud.mongo.collections.users.rules.delete.clauses]]
rule = "match"
eval = "in"
type = "string"
f1 = "args.auth.role"
f2 = ["admin"]

[file_store]
enabled = true

[[file_store.rules]]
prefix = "/public"
[file_store.rules.rules.read]
rule = "allow"

[[file_store.rules]]
prefix = "/users/:user_id"
[file_store.rules.rules.create]
rule = "match"
eval = "=="
type = "string"
f1 = "args.auth.id"
f2 = "args.params.user_id"
"#,
    )
}
