use redb::TableDefinition;

// directories(directoryId PK, directoryPath UNIQUE)
pub const DIRECTORY_PATH_TO_ID: TableDefinition<&str, i32> =
    TableDefinition::new("directory_path_to_id");
pub const DIRECTORY_ID_TO_PATH: TableDefinition<i32, &str> =
    TableDefinition::new("directory_id_to_path");

// sources(sourceId PK, directoryId, sourceName, UNIQUE(directoryId, sourceName))
pub const SOURCE_KEY_TO_ID: TableDefinition<(i32, &str), i32> =
    TableDefinition::new("source_key_to_id");
pub const SOURCE_ID_TO_KEY: TableDefinition<i32, (i32, &str)> =
    TableDefinition::new("source_id_to_key");

// id allocation; both counters start at 0
pub const COUNTERS: TableDefinition<&str, i32> = TableDefinition::new("counters");
pub const KEY_NEXT_DIRECTORY_ID: &str = "next_directory_id";
pub const KEY_NEXT_SOURCE_ID: &str = "next_source_id";
