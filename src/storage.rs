use crate::errors::{AppError, ResultExt};
use crate::models::{
    CleanedContact, CompanyRow, ContactRow, ExportRecord, PersonRecord, RankedCompany,
};
use sqlx::SqlitePool;

/// Storage service for ranked companies and their contacts.
pub struct LeadStore {
    pool: SqlitePool,
}

impl LeadStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Wipes the companies table and writes a fresh ranking.
    ///
    /// Ids are assigned from list position (1-based) so the primary key
    /// always mirrors the published ranking order.
    pub async fn replace_companies(&self, companies: &[RankedCompany]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM companies").execute(&mut *tx).await?;

        for (position, company) in companies.iter().enumerate() {
            sqlx::query("INSERT INTO companies (id, name, url) VALUES (?, ?, ?)")
                .bind(position as i64 + 1)
                .bind(&company.name)
                .bind(&company.domain)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!("✓ Stored {} ranked companies", companies.len());
        Ok(())
    }

    /// Wipes all stored contacts. Used when a full re-enrichment is
    /// requested instead of a resume.
    pub async fn clear_contacts(&self) -> Result<(), AppError> {
        tracing::warn!("Wiping stored contacts");
        sqlx::query("DELETE FROM contacts").execute(&self.pool).await?;
        Ok(())
    }

    /// All companies in ranking order.
    pub async fn companies(&self) -> Result<Vec<CompanyRow>, AppError> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, url FROM companies ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Highest company id that already has contacts, if any.
    ///
    /// Enrichment walks companies in ranking order, so everything at or
    /// below this id was handled by an earlier run and can be skipped.
    pub async fn resume_point(&self) -> Result<Option<i64>, AppError> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(company_id) FROM contacts")
            .fetch_one(&self.pool)
            .await
            .context("Reading the enrichment resume point")?;
        Ok(max)
    }

    /// Contacts stored for one company.
    pub async fn contacts_for(&self, company_id: i64) -> Result<Vec<ContactRow>, AppError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, company_id, first_name, last_name, title, email, phone
            FROM contacts
            WHERE company_id = ?
            ORDER BY id
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stores the people found for one company. Returns how many rows
    /// were written.
    pub async fn insert_contacts(
        &self,
        company_id: i64,
        people: &[PersonRecord],
    ) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0u64;

        for person in people {
            let phone = person
                .phone_numbers
                .first()
                .and_then(|entry| entry.sanitized_number.clone());

            sqlx::query(
                r#"
                INSERT INTO contacts (company_id, first_name, last_name, title, email, phone)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(company_id)
            .bind(&person.first_name)
            .bind(&person.last_name)
            .bind(&person.title)
            .bind(&person.email)
            .bind(phone)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Every company joined against its contacts, NULL contact columns
    /// where none were found. Ordered by ranking position.
    pub async fn export_rows(&self) -> Result<Vec<ExportRecord>, AppError> {
        let rows = sqlx::query_as::<_, ExportRecord>(
            r#"
            SELECT companies.id AS company_id,
                   companies.name,
                   companies.url,
                   contacts.id AS contact_id,
                   contacts.first_name,
                   contacts.last_name,
                   contacts.title,
                   contacts.email,
                   contacts.phone
            FROM companies
            LEFT JOIN contacts ON companies.id = contacts.company_id
            ORDER BY companies.id, contacts.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Fills the missing email/phone of contacts matching a name with
    /// hand-cleaned values. Existing non-empty fields are left alone.
    /// Returns how many rows were touched.
    pub async fn fill_missing_contact_details(
        &self,
        first_name: &str,
        last_name: &str,
        cleaned: &CleanedContact,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET email = COALESCE(NULLIF(email, ''), ?),
                phone = COALESCE(NULLIF(phone, ''), ?)
            WHERE first_name = ? AND last_name = ?
            "#,
        )
        .bind(&cleaned.email)
        .bind(&cleaned.phone)
        .bind(first_name)
        .bind(last_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
