use chinook_db::InitializedSchema;

use crate::commands::CommandOutput;

pub fn run(schema: &InitializedSchema) -> CommandOutput {
    let database = if schema.database_created() { "created" } else { "already present" };
    let table = if schema.customer_table_created() { "created" } else { "already present" };

    CommandOutput::message("schema ready")
        .with_lines(vec![format!("database: {database}"), format!("Customer table: {table}")])
        .with_data(&serde_json::json!({
            "database_created": schema.database_created(),
            "customer_table_created": schema.customer_table_created(),
        }))
}
