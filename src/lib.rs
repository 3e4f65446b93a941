pub mod core;
pub mod codec;
pub mod mvcc;
pub mod schema;
pub mod query;

/*
┌──────────────────────────────────── MARROW LAYOUT ───────────────────────────────────────┐
│                                                                                           │
│  core    Config (clock / migration / scan)        Error { kind, context }                 │
│                                                   ParseError, MigrationError, StorageError│
│                                                                                           │
│  codec   varint ──> wire (WireKey, skip_field) ──> message (measure, write, read)         │
│            │              │                                                               │
│            │              └──uses──> WriteCache (lengths measured once, reused on write)  │
│            └──> fixed (OrderedFixed: sortable big-endian ints, floats, bool, i24)         │
│                                                                                           │
│  mvcc    Hlc (44-bit millis | 20-bit logical) <──issues── ClockController ──> WallClock   │
│                                                                                           │
│  schema  ModelDefinition ──> DependencyGraph ──> order_migration_model_ids               │
│                 │                                      │                                  │
│                 └──> is_migration_needed ──> plan_startup ──> StartupDecision             │
│                 └──> check_model_ids                                                      │
│                                                                                           │
│  query   QualifierMatcher (exact, fuzzy, partial*) ──combined by──> ScanFilter            │
│                                                                                           │
└───────────────────────────────────────────────────────────────────────────────────────────┘
*/
