//! Table and column registry for the on-device step database.
//!
//! Table and column names are part of the on-disk format and must not change.
//! DDL is rendered from the descriptors below instead of being written by hand.

pub const DB_NAME: &str = "steps.db";
pub const CURRENT_VERSION: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `INTEGER PRIMARY KEY AUTOINCREMENT`
    PrimaryKey,
    Integer { default: i64 },
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    /// Schema version that introduced the table.
    pub since_version: i64,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    #[must_use]
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| match c.kind {
                ColumnKind::PrimaryKey => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", c.name),
                ColumnKind::Integer { default } => format!("{} INTEGER DEFAULT {default}", c.name),
                ColumnKind::Text => format!("{} TEXT", c.name),
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {}({})",
            self.name,
            columns.join(", ")
        )
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

const fn pk(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::PrimaryKey,
    }
}

const fn int(name: &'static str, default: i64) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Integer { default },
    }
}

const fn text(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        kind: ColumnKind::Text,
    }
}

pub mod steps_count {
    pub const TABLE: &str = "steps_count";
    pub const ID: &str = "ID";
    pub const START_TIME: &str = "start_time";
    pub const USE_TIME: &str = "use_time";
    pub const STEPS: &str = "steps_num";
    pub const TYPE: &str = "type";
    pub const SUB_TYPE: &str = "sub_type";
    pub const SPEED: &str = "speed";
    pub const STATUS: &str = "Cstatus";
    pub const CAL: &str = "cal";
    pub const SYNC1: &str = "sync1";
    pub const SYNC2: &str = "sync2";
    pub const DISTANCE: &str = "distance";
}

pub mod step_per_day {
    pub const TABLE: &str = "step_per_day";
    pub const ID: &str = "ID";
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const STEP_COUNT: &str = "step_count";
    pub const STATE: &str = "state";
    pub const BACKUP1: &str = "backup1";
}

pub mod target {
    pub const TABLE: &str = "target";
    pub const ID: &str = "ID";
    pub const NAME: &str = "target_name";
    pub const HINT: &str = "target_hint";
    pub const ALL_TIMES: &str = "target_all_times";
    pub const FINISH_TIMES: &str = "target_finish_times";
    pub const IS_LOOP: &str = "is_loop";
    pub const ACHIEVE_DATA_LIST: &str = "achieve_data_list";
    pub const CREATE_DATE: &str = "start_time";
    pub const LAST_DATE: &str = "last_time";
    pub const TARGET_DATE: &str = "target_time";
    pub const TARGET_TYPE: &str = "target_type";
    pub const SYNC1: &str = "target_sync1";
    pub const SYNC2: &str = "target_sync2";
    pub const SYNC3: &str = "target_sync3";
    pub const SYNC4: &str = "target_sync4";
}

/// The table name keeps the historical spelling used on devices.
pub mod body_record {
    pub const TABLE: &str = "boday_record";
    pub const ID: &str = "ID";
    pub const TIME: &str = "target_time";
    pub const TYPE: &str = "target_type";
    pub const DATA: &str = "data";
    pub const UNIT: &str = "unit";
}

pub mod water_log {
    pub const TABLE: &str = "water_log";
    pub const ID: &str = "ID";
    pub const TIME: &str = "time";
    pub const AMOUNT: &str = "amount";
    pub const NOTE: &str = "note";
}

pub mod bowel_log {
    pub const TABLE: &str = "bowel_log";
    pub const ID: &str = "ID";
    pub const TIME: &str = "time";
    pub const STATUS: &str = "status";
    pub const NOTE: &str = "note";
}

pub mod menstruation_log {
    pub const TABLE: &str = "menstruation_log";
    pub const ID: &str = "ID";
    pub const START_TIME: &str = "start_time";
    pub const END_TIME: &str = "end_time";
    pub const CYCLE_LENGTH: &str = "cycle_length";
    pub const NOTE: &str = "note";
}

pub mod sleep_log {
    pub const TABLE: &str = "sleep_log";
    pub const ID: &str = "ID";
    pub const START_TIME: &str = "start_time";
    pub const END_TIME: &str = "end_time";
    pub const QUALITY: &str = "quality";
    pub const NOTE: &str = "note";
}

pub mod mood_log {
    pub const TABLE: &str = "mood_log";
    pub const ID: &str = "ID";
    pub const TIME: &str = "time";
    pub const SCORE: &str = "score";
    pub const NOTE: &str = "note";
}

pub const STEPS_COUNT: TableDef = TableDef {
    name: steps_count::TABLE,
    since_version: 1,
    columns: &[
        pk(steps_count::ID),
        int(steps_count::START_TIME, 0),
        int(steps_count::USE_TIME, 0),
        int(steps_count::STEPS, 0),
        int(steps_count::TYPE, 0),
        int(steps_count::SUB_TYPE, 0),
        text(steps_count::SPEED),
        text(steps_count::STATUS),
        text(steps_count::CAL),
        text(steps_count::SYNC1),
        text(steps_count::SYNC2),
        text(steps_count::DISTANCE),
    ],
};

pub const STEP_PER_DAY: TableDef = TableDef {
    name: step_per_day::TABLE,
    since_version: 1,
    columns: &[
        pk(step_per_day::ID),
        text(step_per_day::DATE),
        int(step_per_day::TIME, 0),
        int(step_per_day::STEP_COUNT, 0),
        int(step_per_day::STATE, 0),
        int(step_per_day::BACKUP1, 0),
    ],
};

pub const TARGET: TableDef = TableDef {
    name: target::TABLE,
    since_version: 1,
    columns: &[
        pk(target::ID),
        text(target::NAME),
        text(target::HINT),
        int(target::ALL_TIMES, 1),
        int(target::FINISH_TIMES, 0),
        int(target::IS_LOOP, 0),
        text(target::ACHIEVE_DATA_LIST),
        int(target::CREATE_DATE, 0),
        int(target::LAST_DATE, 0),
        int(target::TARGET_DATE, 0),
        int(target::TARGET_TYPE, 0),
        text(target::SYNC1),
        text(target::SYNC2),
        text(target::SYNC3),
        text(target::SYNC4),
    ],
};

pub const BODY_RECORD: TableDef = TableDef {
    name: body_record::TABLE,
    since_version: 1,
    columns: &[
        pk(body_record::ID),
        int(body_record::TIME, 0),
        int(body_record::TYPE, 0),
        text(body_record::DATA),
        text(body_record::UNIT),
    ],
};

pub const WATER_LOG: TableDef = TableDef {
    name: water_log::TABLE,
    since_version: 2,
    columns: &[
        pk(water_log::ID),
        int(water_log::TIME, 0),
        int(water_log::AMOUNT, 0),
        text(water_log::NOTE),
    ],
};

pub const BOWEL_LOG: TableDef = TableDef {
    name: bowel_log::TABLE,
    since_version: 2,
    columns: &[
        pk(bowel_log::ID),
        int(bowel_log::TIME, 0),
        text(bowel_log::STATUS),
        text(bowel_log::NOTE),
    ],
};

pub const MENSTRUATION_LOG: TableDef = TableDef {
    name: menstruation_log::TABLE,
    since_version: 2,
    columns: &[
        pk(menstruation_log::ID),
        int(menstruation_log::START_TIME, 0),
        int(menstruation_log::END_TIME, 0),
        int(menstruation_log::CYCLE_LENGTH, 28),
        text(menstruation_log::NOTE),
    ],
};

pub const SLEEP_LOG: TableDef = TableDef {
    name: sleep_log::TABLE,
    since_version: 2,
    columns: &[
        pk(sleep_log::ID),
        int(sleep_log::START_TIME, 0),
        int(sleep_log::END_TIME, 0),
        int(sleep_log::QUALITY, 3),
        text(sleep_log::NOTE),
    ],
};

pub const MOOD_LOG: TableDef = TableDef {
    name: mood_log::TABLE,
    since_version: 2,
    columns: &[
        pk(mood_log::ID),
        int(mood_log::TIME, 0),
        int(mood_log::SCORE, 3),
        text(mood_log::NOTE),
    ],
};

pub const ALL_TABLES: &[TableDef] = &[
    STEPS_COUNT,
    STEP_PER_DAY,
    TARGET,
    BODY_RECORD,
    WATER_LOG,
    BOWEL_LOG,
    MENSTRUATION_LOG,
    SLEEP_LOG,
    MOOD_LOG,
];

/// Tables that must be created to bring a store at `stored_version` up to
/// [`CURRENT_VERSION`]. A fresh store (version 0) gets every table.
#[must_use]
pub fn tables_to_create(stored_version: i64) -> Vec<&'static TableDef> {
    ALL_TABLES
        .iter()
        .filter(|t| t.since_version > stored_version && t.since_version <= CURRENT_VERSION)
        .collect()
}

#[must_use]
pub fn table(name: &str) -> Option<&'static TableDef> {
    ALL_TABLES.iter().find(|t| t.name == name)
}
