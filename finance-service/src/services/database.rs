//! Database service for finance-service.
//!
//! Pool-level methods (`&self`) serve read paths and simple inserts.
//! Transaction-scoped operations are associated functions taking a
//! `&mut SqliteConnection`, so the workflow layer can compose them inside
//! one `sqlx` transaction and get all-or-nothing semantics.

use crate::models::{
    Bill, CashBook, CashBookEntry, EntryDirection, PaymentProof, PaymentRecord, Pool, ProofStatus,
    Student, StudentStatus, Wallet, WalletTransaction, Withdrawal, WithdrawalStatus,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Proof row joined with the student it belongs to, for list views.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ProofListRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub proof: PaymentProof,
    pub student_name: String,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and build the connection pool.
    #[instrument(skip(database_url), fields(service = "finance-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Opening SQLite database"
        );

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction (one unit of work).
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, AppError> {
        self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>, AppError> {
        self.pool.acquire().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to acquire connection: {}", e))
        })
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Student Operations
    // -------------------------------------------------------------------------

    /// Create a minimal student row.
    #[instrument(skip(self, name, class_name, dormitory, guardian_phone))]
    pub async fn create_student(
        &self,
        name: &str,
        class_name: Option<&str>,
        dormitory: Option<&str>,
        guardian_phone: Option<&str>,
    ) -> Result<Student, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_student"])
            .start_timer();

        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (student_id, name, class_name, dormitory, guardian_phone, status, created_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING student_id, name, class_name, dormitory, guardian_phone, status, transfer_out_month, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(class_name)
        .bind(dormitory)
        .bind(guardian_phone)
        .bind(StudentStatus::Active.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create student: {}", e)))?;

        timer.observe_duration();

        info!(student_id = %student.student_id, "Student created");

        Ok(student)
    }

    pub async fn get_student(&self, student_id: Uuid) -> Result<Option<Student>, AppError> {
        let mut conn = self.acquire().await?;
        Self::find_student(&mut conn, student_id).await
    }

    pub async fn find_student(
        conn: &mut SqliteConnection,
        student_id: Uuid,
    ) -> Result<Option<Student>, AppError> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT student_id, name, class_name, dormitory, guardian_phone, status, transfer_out_month, created_utc
            FROM students
            WHERE student_id = ?1
            "#,
        )
        .bind(student_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get student: {}", e)))
    }

    /// Flag a student as transferred out effective the given `YYYY-MM` month.
    pub async fn mark_transferred_out(
        conn: &mut SqliteConnection,
        student_id: Uuid,
        effective_month: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE students
            SET status = ?1, transfer_out_month = ?2
            WHERE student_id = ?3
            "#,
        )
        .bind(StudentStatus::TransferredOut.as_str())
        .bind(effective_month)
        .bind(student_id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark transfer-out: {}", e))
        })?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Bill Operations
    // -------------------------------------------------------------------------

    /// Create a bill for a student and period.
    #[instrument(skip(self, title), fields(student_id = %student_id, period = %period))]
    pub async fn create_bill(
        &self,
        student_id: Uuid,
        title: &str,
        period: &str,
        nominal: i64,
        due_date: NaiveDate,
    ) -> Result<Bill, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_bill"])
            .start_timer();

        let now = Utc::now();
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            INSERT INTO bills (bill_id, student_id, title, period, nominal, paid_amount, status, due_date, created_utc, updated_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, 'unpaid', ?6, ?7, ?7)
            RETURNING bill_id, student_id, title, period, nominal, paid_amount, status, due_date, deleted_utc, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(title)
        .bind(period)
        .bind(nominal)
        .bind(due_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create bill: {}", e)))?;

        timer.observe_duration();

        Ok(bill)
    }

    pub async fn find_bill(
        conn: &mut SqliteConnection,
        bill_id: Uuid,
    ) -> Result<Option<Bill>, AppError> {
        sqlx::query_as::<_, Bill>(
            r#"
            SELECT bill_id, student_id, title, period, nominal, paid_amount, status, due_date, deleted_utc, created_utc, updated_utc
            FROM bills
            WHERE bill_id = ?1
            "#,
        )
        .bind(bill_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get bill: {}", e)))
    }

    /// List a student's bills, newest period first.
    #[instrument(skip(self), fields(student_id = %student_id))]
    pub async fn list_student_bills(
        &self,
        student_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Bill>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_student_bills"])
            .start_timer();

        let bills = sqlx::query_as::<_, Bill>(
            r#"
            SELECT bill_id, student_id, title, period, nominal, paid_amount, status, due_date, deleted_utc, created_utc, updated_utc
            FROM bills
            WHERE student_id = ?1
              AND (?2 OR deleted_utc IS NULL)
            ORDER BY period DESC, created_utc DESC
            "#,
        )
        .bind(student_id)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list bills: {}", e)))?;

        timer.observe_duration();

        Ok(bills)
    }

    /// Settle a bill in full: paid-to-date becomes the nominal.
    pub async fn settle_bill(conn: &mut SqliteConnection, bill_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE bills
            SET paid_amount = nominal, status = 'paid', updated_utc = ?1
            WHERE bill_id = ?2
            "#,
        )
        .bind(Utc::now())
        .bind(bill_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to settle bill: {}", e)))?;
        Ok(())
    }

    /// Live bills dated strictly after the given `YYYY-MM` period.
    pub async fn list_bills_after_period(
        conn: &mut SqliteConnection,
        student_id: Uuid,
        period: &str,
    ) -> Result<Vec<Bill>, AppError> {
        sqlx::query_as::<_, Bill>(
            r#"
            SELECT bill_id, student_id, title, period, nominal, paid_amount, status, due_date, deleted_utc, created_utc, updated_utc
            FROM bills
            WHERE student_id = ?1
              AND deleted_utc IS NULL
              AND period > ?2
            ORDER BY period
            "#,
        )
        .bind(student_id)
        .bind(period)
        .fetch_all(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list future bills: {}", e))
        })
    }

    pub async fn soft_delete_bill(
        conn: &mut SqliteConnection,
        bill_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE bills
            SET deleted_utc = ?1, updated_utc = ?1
            WHERE bill_id = ?2
            "#,
        )
        .bind(Utc::now())
        .bind(bill_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete bill: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment Proof Operations
    // -------------------------------------------------------------------------

    pub async fn insert_proof(
        conn: &mut SqliteConnection,
        proof: &PaymentProof,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payment_proofs (proof_id, student_id, kind, total_amount, topup_amount, note, blob_ref, status, created_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(proof.proof_id)
        .bind(proof.student_id)
        .bind(&proof.kind)
        .bind(proof.total_amount)
        .bind(proof.topup_amount)
        .bind(&proof.note)
        .bind(&proof.blob_ref)
        .bind(&proof.status)
        .bind(proof.created_utc)
        .execute(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert proof: {}", e)))?;
        Ok(())
    }

    pub async fn insert_proof_bill(
        conn: &mut SqliteConnection,
        proof_id: Uuid,
        bill_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO proof_bills (proof_id, bill_id) VALUES (?1, ?2)")
            .bind(proof_id)
            .bind(bill_id)
            .execute(conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to link proof bill: {}", e))
            })?;
        Ok(())
    }

    pub async fn find_proof(
        conn: &mut SqliteConnection,
        proof_id: Uuid,
    ) -> Result<Option<PaymentProof>, AppError> {
        sqlx::query_as::<_, PaymentProof>(
            r#"
            SELECT proof_id, student_id, kind, total_amount, topup_amount, note, blob_ref, status, admin_note, processed_by, processed_utc, created_utc
            FROM payment_proofs
            WHERE proof_id = ?1
            "#,
        )
        .bind(proof_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get proof: {}", e)))
    }

    pub async fn get_proof(&self, proof_id: Uuid) -> Result<Option<PaymentProof>, AppError> {
        let mut conn = self.acquire().await?;
        Self::find_proof(&mut conn, proof_id).await
    }

    pub async fn proof_bill_ids(
        conn: &mut SqliteConnection,
        proof_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        sqlx::query_scalar::<_, Uuid>("SELECT bill_id FROM proof_bills WHERE proof_id = ?1")
            .bind(proof_id)
            .fetch_all(conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get proof bills: {}", e))
            })
    }

    /// List proofs joined with the student name, optionally filtered by
    /// status, newest first.
    #[instrument(skip(self))]
    pub async fn list_proofs(&self, status: Option<&str>) -> Result<Vec<ProofListRow>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_proofs"])
            .start_timer();

        let rows = sqlx::query_as::<_, ProofListRow>(
            r#"
            SELECT p.proof_id, p.student_id, p.kind, p.total_amount, p.topup_amount, p.note, p.blob_ref,
                   p.status, p.admin_note, p.processed_by, p.processed_utc, p.created_utc,
                   s.name AS student_name
            FROM payment_proofs p
            JOIN students s ON s.student_id = p.student_id
            WHERE (?1 IS NULL OR p.status = ?1)
            ORDER BY p.created_utc DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list proofs: {}", e)))?;

        timer.observe_duration();

        Ok(rows)
    }

    /// Stamp a proof's terminal state.
    pub async fn finalize_proof(
        conn: &mut SqliteConnection,
        proof_id: Uuid,
        status: ProofStatus,
        admin_note: &str,
        processed_by: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE payment_proofs
            SET status = ?1, admin_note = ?2, processed_by = ?3, processed_utc = ?4
            WHERE proof_id = ?5
            "#,
        )
        .bind(status.as_str())
        .bind(admin_note)
        .bind(processed_by)
        .bind(Utc::now())
        .bind(proof_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to finalize proof: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment Record Operations
    // -------------------------------------------------------------------------

    pub async fn insert_payment_record(
        conn: &mut SqliteConnection,
        record: &PaymentRecord,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payment_records (payment_id, bill_id, proof_id, amount, remaining_before, remaining_after, method, created_by, created_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(record.payment_id)
        .bind(record.bill_id)
        .bind(record.proof_id)
        .bind(record.amount)
        .bind(record.remaining_before)
        .bind(record.remaining_after)
        .bind(&record.method)
        .bind(&record.created_by)
        .bind(record.created_utc)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment record: {}", e))
        })?;
        Ok(())
    }

    pub async fn list_payment_records_for_proof(
        &self,
        proof_id: Uuid,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT payment_id, bill_id, proof_id, amount, remaining_before, remaining_after, method, created_by, created_utc
            FROM payment_records
            WHERE proof_id = ?1
            ORDER BY created_utc
            "#,
        )
        .bind(proof_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list payment records: {}", e))
        })
    }

    // -------------------------------------------------------------------------
    // Cash Book Operations
    // -------------------------------------------------------------------------

    /// Fetch a cash book by code, creating it when absent (startup seeding).
    #[instrument(skip(self, name))]
    pub async fn get_or_create_cash_book(
        &self,
        code: &str,
        name: &str,
    ) -> Result<CashBook, AppError> {
        sqlx::query("INSERT INTO cash_books (book_id, code, name, created_utc) VALUES (?1, ?2, ?3, ?4) ON CONFLICT (code) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(code)
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to seed cash book: {}", e)))?;

        self.get_cash_book_by_code(code).await?.ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("Cash book '{}' missing after seed", code))
        })
    }

    pub async fn get_cash_book_by_code(&self, code: &str) -> Result<Option<CashBook>, AppError> {
        sqlx::query_as::<_, CashBook>(
            "SELECT book_id, code, name, created_utc FROM cash_books WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get cash book: {}", e)))
    }

    /// List a book's entries, optionally filtered by direction.
    #[instrument(skip(self), fields(book_id = %book_id))]
    pub async fn list_cash_book_entries(
        &self,
        book_id: Uuid,
        direction: Option<EntryDirection>,
    ) -> Result<Vec<CashBookEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_cash_book_entries"])
            .start_timer();

        let entries = sqlx::query_as::<_, CashBookEntry>(
            r#"
            SELECT entry_id, book_id, doc_number, direction, category, amount, payment_id, description, created_by, created_utc
            FROM cash_book_entries
            WHERE book_id = ?1
              AND (?2 IS NULL OR direction = ?2)
            ORDER BY created_utc, doc_number
            "#,
        )
        .bind(book_id)
        .bind(direction.map(|d| d.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list entries: {}", e)))?;

        timer.observe_duration();

        Ok(entries)
    }

    /// Atomically advance the (book, direction, day) sequence and return the
    /// new value. Runs inside the caller's transaction, so a rollback also
    /// releases the claimed number.
    pub async fn next_sequence(
        conn: &mut SqliteConnection,
        book_id: Uuid,
        direction: EntryDirection,
        seq_date: NaiveDate,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO cash_book_sequences (book_id, direction, seq_date, last_seq)
            VALUES (?1, ?2, ?3, 1)
            ON CONFLICT (book_id, direction, seq_date)
            DO UPDATE SET last_seq = last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(book_id)
        .bind(direction.as_str())
        .bind(seq_date)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance sequence: {}", e))
        })
    }

    /// Insert a cash book entry. Returns `None` when the document number is
    /// already taken (unique violation), letting the numbering layer
    /// re-allocate.
    pub async fn try_insert_cash_book_entry(
        conn: &mut SqliteConnection,
        entry: &CashBookEntry,
    ) -> Result<Option<CashBookEntry>, AppError> {
        let result = sqlx::query_as::<_, CashBookEntry>(
            r#"
            INSERT INTO cash_book_entries (entry_id, book_id, doc_number, direction, category, amount, payment_id, description, created_by, created_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING entry_id, book_id, doc_number, direction, category, amount, payment_id, description, created_by, created_utc
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.book_id)
        .bind(&entry.doc_number)
        .bind(&entry.direction)
        .bind(&entry.category)
        .bind(entry.amount)
        .bind(entry.payment_id)
        .bind(&entry.description)
        .bind(&entry.created_by)
        .bind(entry.created_utc)
        .fetch_one(conn)
        .await;

        match result {
            Ok(inserted) => Ok(Some(inserted)),
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => Ok(None),
            Err(e) => Err(AppError::DatabaseError(anyhow::anyhow!(
                "Failed to insert cash book entry: {}",
                e
            ))),
        }
    }

    // -------------------------------------------------------------------------
    // Wallet Operations
    // -------------------------------------------------------------------------

    pub async fn find_wallet_by_student(
        conn: &mut SqliteConnection,
        student_id: Uuid,
    ) -> Result<Option<Wallet>, AppError> {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT wallet_id, student_id, balance, created_utc, updated_utc
            FROM wallets
            WHERE student_id = ?1
            "#,
        )
        .bind(student_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get wallet: {}", e)))
    }

    pub async fn get_wallet_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Option<Wallet>, AppError> {
        let mut conn = self.acquire().await?;
        Self::find_wallet_by_student(&mut conn, student_id).await
    }

    /// Fetch the student's wallet, creating an empty one when absent.
    pub async fn get_or_create_wallet(
        conn: &mut SqliteConnection,
        student_id: Uuid,
    ) -> Result<Wallet, AppError> {
        if let Some(wallet) = Self::find_wallet_by_student(conn, student_id).await? {
            return Ok(wallet);
        }

        sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (wallet_id, student_id, balance, created_utc, updated_utc)
            VALUES (?1, ?2, 0, ?3, ?3)
            RETURNING wallet_id, student_id, balance, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(Utc::now())
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create wallet: {}", e)))
    }

    /// Apply a signed delta to the wallet balance in one statement and
    /// return the new balance. `None` means the guard refused (balance would
    /// go negative and `allow_negative` was false).
    pub async fn apply_wallet_delta(
        conn: &mut SqliteConnection,
        wallet_id: Uuid,
        delta: i64,
        allow_negative: bool,
    ) -> Result<Option<i64>, AppError> {
        let sql = if allow_negative {
            r#"
            UPDATE wallets
            SET balance = balance + ?1, updated_utc = ?2
            WHERE wallet_id = ?3
            RETURNING balance
            "#
        } else {
            r#"
            UPDATE wallets
            SET balance = balance + ?1, updated_utc = ?2
            WHERE wallet_id = ?3 AND balance + ?1 >= 0
            RETURNING balance
            "#
        };

        sqlx::query_scalar::<_, i64>(sql)
            .bind(delta)
            .bind(Utc::now())
            .bind(wallet_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update wallet balance: {}", e))
            })
    }

    pub async fn insert_wallet_transaction(
        conn: &mut SqliteConnection,
        tx_row: &WalletTransaction,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO wallet_transactions
                (transaction_id, wallet_id, kind, amount, balance_after, description, method, pool_id, voided, replaces_transaction_id, created_by, created_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?11)
            "#,
        )
        .bind(tx_row.transaction_id)
        .bind(tx_row.wallet_id)
        .bind(&tx_row.kind)
        .bind(tx_row.amount)
        .bind(tx_row.balance_after)
        .bind(&tx_row.description)
        .bind(&tx_row.method)
        .bind(tx_row.pool_id)
        .bind(tx_row.replaces_transaction_id)
        .bind(&tx_row.created_by)
        .bind(tx_row.created_utc)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert wallet transaction: {}", e))
        })?;
        Ok(())
    }

    pub async fn find_wallet_transaction(
        conn: &mut SqliteConnection,
        transaction_id: Uuid,
    ) -> Result<Option<WalletTransaction>, AppError> {
        sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT transaction_id, wallet_id, kind, amount, balance_after, description, method, pool_id,
                   voided, voided_by, void_reason, voided_utc, replaces_transaction_id, created_by, created_utc
            FROM wallet_transactions
            WHERE transaction_id = ?1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get wallet transaction: {}", e))
        })
    }

    /// Flag a transaction voided. Monetary fields stay untouched.
    pub async fn mark_transaction_voided(
        conn: &mut SqliteConnection,
        transaction_id: Uuid,
        voided_by: &str,
        reason: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE wallet_transactions
            SET voided = 1, voided_by = ?1, void_reason = ?2, voided_utc = ?3
            WHERE transaction_id = ?4
            "#,
        )
        .bind(voided_by)
        .bind(reason)
        .bind(Utc::now())
        .bind(transaction_id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to void wallet transaction: {}", e))
        })?;
        Ok(())
    }

    /// Wallet history, oldest first.
    #[instrument(skip(self), fields(wallet_id = %wallet_id))]
    pub async fn list_wallet_transactions(
        &self,
        wallet_id: Uuid,
    ) -> Result<Vec<WalletTransaction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_wallet_transactions"])
            .start_timer();

        let rows = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT transaction_id, wallet_id, kind, amount, balance_after, description, method, pool_id,
                   voided, voided_by, void_reason, voided_utc, replaces_transaction_id, created_by, created_utc
            FROM wallet_transactions
            WHERE wallet_id = ?1
            ORDER BY created_utc, transaction_id
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list wallet transactions: {}", e))
        })?;

        timer.observe_duration();

        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Pool Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, name))]
    pub async fn create_pool(&self, name: &str) -> Result<Pool, AppError> {
        let pool = sqlx::query_as::<_, Pool>(
            r#"
            INSERT INTO pools (pool_id, name, balance, created_utc, updated_utc)
            VALUES (?1, ?2, 0, ?3, ?3)
            RETURNING pool_id, name, balance, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create pool: {}", e)))?;

        info!(pool_id = %pool.pool_id, "Pool created");

        Ok(pool)
    }

    pub async fn find_pool(
        conn: &mut SqliteConnection,
        pool_id: Uuid,
    ) -> Result<Option<Pool>, AppError> {
        sqlx::query_as::<_, Pool>(
            r#"
            SELECT pool_id, name, balance, created_utc, updated_utc
            FROM pools
            WHERE pool_id = ?1
            "#,
        )
        .bind(pool_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get pool: {}", e)))
    }

    pub async fn get_pool(&self, pool_id: Uuid) -> Result<Option<Pool>, AppError> {
        let mut conn = self.acquire().await?;
        Self::find_pool(&mut conn, pool_id).await
    }

    /// Apply a signed delta to a pool balance; same guard contract as
    /// [`Database::apply_wallet_delta`].
    pub async fn apply_pool_delta(
        conn: &mut SqliteConnection,
        pool_id: Uuid,
        delta: i64,
        allow_negative: bool,
    ) -> Result<Option<i64>, AppError> {
        let sql = if allow_negative {
            r#"
            UPDATE pools
            SET balance = balance + ?1, updated_utc = ?2
            WHERE pool_id = ?3
            RETURNING balance
            "#
        } else {
            r#"
            UPDATE pools
            SET balance = balance + ?1, updated_utc = ?2
            WHERE pool_id = ?3 AND balance + ?1 >= 0
            RETURNING balance
            "#
        };

        sqlx::query_scalar::<_, i64>(sql)
            .bind(delta)
            .bind(Utc::now())
            .bind(pool_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update pool balance: {}", e))
            })
    }

    // -------------------------------------------------------------------------
    // Withdrawal Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, note), fields(amount = amount))]
    pub async fn create_withdrawal(
        &self,
        pool_id: Option<Uuid>,
        amount: i64,
        note: Option<&str>,
        requested_by: &str,
    ) -> Result<Withdrawal, AppError> {
        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (withdrawal_id, pool_id, amount, status, note, requested_by, created_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING withdrawal_id, pool_id, amount, status, method, note, reject_reason, requested_by, processed_by, created_utc, processed_utc, completed_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(pool_id)
        .bind(amount)
        .bind(WithdrawalStatus::Pending.as_str())
        .bind(note)
        .bind(requested_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create withdrawal: {}", e))
        })?;

        info!(withdrawal_id = %withdrawal.withdrawal_id, "Withdrawal requested");

        Ok(withdrawal)
    }

    pub async fn find_withdrawal(
        conn: &mut SqliteConnection,
        withdrawal_id: Uuid,
    ) -> Result<Option<Withdrawal>, AppError> {
        sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT withdrawal_id, pool_id, amount, status, method, note, reject_reason, requested_by, processed_by, created_utc, processed_utc, completed_utc
            FROM withdrawals
            WHERE withdrawal_id = ?1
            "#,
        )
        .bind(withdrawal_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get withdrawal: {}", e)))
    }

    #[instrument(skip(self))]
    pub async fn list_withdrawals(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<Withdrawal>, AppError> {
        sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT withdrawal_id, pool_id, amount, status, method, note, reject_reason, requested_by, processed_by, created_utc, processed_utc, completed_utc
            FROM withdrawals
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_utc DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list withdrawals: {}", e)))
    }

    pub async fn set_withdrawal_approved(
        conn: &mut SqliteConnection,
        withdrawal_id: Uuid,
        method: &str,
        processed_by: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = ?1, method = ?2, processed_by = ?3, processed_utc = ?4
            WHERE withdrawal_id = ?5
            "#,
        )
        .bind(WithdrawalStatus::Approved.as_str())
        .bind(method)
        .bind(processed_by)
        .bind(Utc::now())
        .bind(withdrawal_id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to approve withdrawal: {}", e))
        })?;
        Ok(())
    }

    pub async fn set_withdrawal_rejected(
        conn: &mut SqliteConnection,
        withdrawal_id: Uuid,
        reason: &str,
        processed_by: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = ?1, reject_reason = ?2, processed_by = ?3, processed_utc = ?4
            WHERE withdrawal_id = ?5
            "#,
        )
        .bind(WithdrawalStatus::Rejected.as_str())
        .bind(reason)
        .bind(processed_by)
        .bind(Utc::now())
        .bind(withdrawal_id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to reject withdrawal: {}", e))
        })?;
        Ok(())
    }

    pub async fn set_withdrawal_completed(
        conn: &mut SqliteConnection,
        withdrawal_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = ?1, completed_utc = ?2
            WHERE withdrawal_id = ?3
            "#,
        )
        .bind(WithdrawalStatus::Completed.as_str())
        .bind(Utc::now())
        .bind(withdrawal_id)
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to complete withdrawal: {}", e))
        })?;
        Ok(())
    }
}
