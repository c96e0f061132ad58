use super::{Db, ResultMode};
use crate::driver::{CommandKind, Driver, Params};
use crate::error::SqlBridgeError;
use crate::record::Record;
use crate::results::{CustomDbRow, ResultSet, RowReader};
use crate::types::FromRowValue;

/// Stored procedures (`sp_*`) and set-returning functions (`fn_*`).
impl<D: Driver> Db<D> {
    /// # Errors
    /// See [`Db::run`].
    pub async fn sp_reader(&self, name: &str, params: impl Into<Params>) -> Result<RowReader, SqlBridgeError> {
        let command = self.command(name, CommandKind::StoredProcedure, params);
        self.run(command, ResultMode::Reader).await?.into_reader()
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn sp_result(&self, name: &str, params: impl Into<Params>) -> Result<ResultSet, SqlBridgeError> {
        let reader = self.sp_reader(name, params).await?;
        self.read_rows(reader).await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn sp_first(
        &self,
        name: &str,
        params: impl Into<Params>,
    ) -> Result<Option<CustomDbRow>, SqlBridgeError> {
        Ok(self.sp_result(name, params).await?.into_rows().into_iter().next())
    }

    /// # Errors
    /// See [`Db::run`]; `MappingError` when the value does not convert.
    pub async fn sp_scalar<T: FromRowValue>(
        &self,
        name: &str,
        params: impl Into<Params>,
    ) -> Result<T, SqlBridgeError> {
        let command = self.command(name, CommandKind::StoredProcedure, params);
        self.run(command, ResultMode::Scalar).await?.into_scalar()
    }

    /// Run a procedure as a non-query and return its integer return value, falling back to
    /// the affected-row count when the procedure returns nothing.
    ///
    /// # Errors
    /// See [`Db::run`].
    pub async fn sp_execute(&self, name: &str, params: impl Into<Params>) -> Result<i64, SqlBridgeError> {
        let command = self
            .command(name, CommandKind::StoredProcedure, params)
            .with_param(self.driver().create_return_parameter());
        self.run(command, ResultMode::Affected).await?.into_affected()
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn fn_reader(&self, name: &str, args: Record) -> Result<RowReader, SqlBridgeError> {
        self.statement_reader(self.qb().call_function(name, args, false))
            .await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn fn_result(&self, name: &str, args: Record) -> Result<ResultSet, SqlBridgeError> {
        let reader = self.fn_reader(name, args).await?;
        self.read_rows(reader).await
    }

    /// # Errors
    /// See [`Db::run`].
    pub async fn fn_first(&self, name: &str, args: Record) -> Result<Option<CustomDbRow>, SqlBridgeError> {
        Ok(self.fn_result(name, args).await?.into_rows().into_iter().next())
    }

    /// # Errors
    /// See [`Db::run`]; `MappingError` when the value does not convert.
    pub async fn fn_scalar<T: FromRowValue>(&self, name: &str, args: Record) -> Result<T, SqlBridgeError> {
        self.statement_scalar(self.qb().call_function(name, args, true))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Db;
    use crate::driver::{CommandKind, ParamDirection};
    use crate::record;
    use crate::results::ResultSet;
    use crate::test_utils::{MockDriver, Script};
    use crate::types::{DatabaseType, RowValues};

    #[tokio::test]
    async fn sp_execute_registers_a_return_value() {
        let driver = MockDriver::new(DatabaseType::Mssql);
        driver.push(Script::Executed {
            rows_affected: 3,
            return_value: Some(42),
        });
        let db = Db::new(driver.clone(), "mock");

        let ret = db.sp_execute("usp_touch", record! { id: 1 }).await.unwrap();
        assert_eq!(ret, 42);

        let command = driver.last_command().unwrap();
        assert_eq!(command.kind, CommandKind::StoredProcedure);
        assert_eq!(command.params[0].name.as_deref(), Some("@id"));
        assert_eq!(command.params[1].direction, ParamDirection::ReturnValue);
        assert_eq!(command.params[1].name.as_deref(), Some("@returnValue"));
    }

    #[tokio::test]
    async fn sp_execute_falls_back_to_rows_affected() {
        let driver = MockDriver::new(DatabaseType::Postgres);
        driver.push(Script::Executed {
            rows_affected: 5,
            return_value: None,
        });
        let db = Db::new(driver, "mock");
        assert_eq!(db.sp_execute("do_work", ()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn fn_scalar_calls_the_function_with_positional_args() {
        let driver = MockDriver::new(DatabaseType::Postgres);
        driver.push(Script::Scalar(RowValues::Float(12.5)));
        let db = Db::new(driver.clone(), "mock");

        let avg: f64 = db
            .fn_scalar("avg_score", record! { player: 3 })
            .await
            .unwrap();
        assert!((avg - 12.5).abs() < f64::EPSILON);
        let command = driver.last_command().unwrap();
        assert_eq!(command.text, "SELECT * FROM avg_score($1)");
        assert_eq!(command.kind, CommandKind::Text);
    }

    #[tokio::test]
    async fn sp_result_materializes_rows() {
        let mut rows = ResultSet::with_columns(vec!["id".into(), "name".into()], 2);
        rows.add_row_values(vec![RowValues::Int(1), RowValues::from("a")]);
        rows.add_row_values(vec![RowValues::Int(2), RowValues::from("b")]);
        let driver = MockDriver::new(DatabaseType::Mssql);
        driver.push(Script::Rows(rows));
        let db = Db::new(driver.clone(), "mock");

        let first = db.sp_first("usp_list", ()).await.unwrap().unwrap();
        assert_eq!(first.get("name"), Some(&RowValues::from("a")));
        assert_eq!(driver.open_connections(), 0);
    }
}
