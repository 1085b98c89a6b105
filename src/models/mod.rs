// ============================================================================
// MODELS - MAIN MODULE
// ============================================================================
//
// Description:
//   Entry point for all data models.
//   Each model maps to a PostgreSQL table through SeaORM; in mock mode the
//   same Model structs live in the in-memory store.
//
// Modules:
//   - health : Health check API
//   - users : Accounts (email + password hash + reset token)
//   - wallet : Per-user, per-currency balance records
//   - transaction : Wallet transfer history (append-only)
//   - order : Buy/sell orders (PENDING -> FILLED | CANCELLED)
//   - dto : Data Transfer Objects for the trade API
//
// Notes:
//   - All models use SeaORM entities (no raw SQL)
//   - Relations between tables are defined in each model
//
// ============================================================================

pub mod dto;
pub mod health;
pub mod order;
pub mod transaction;
pub mod users;
pub mod wallet;
