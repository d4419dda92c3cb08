//! Statement template construction.
//!
//! [`SqlBuilder`] interleaves literal SQL fragments with bound arguments and
//! produces a parameterized [`Statement`]. Array arguments expand to an
//! `IN (...)` placeholder group, and a previously built statement can be
//! embedded into another, splicing its SQL and appending its arguments.
//!
//! Two behaviors are contracts of this builder, not bugs:
//!
//! - Array arguments are deduplicated to their distinct elements (first-seen
//!   order) before placeholders are emitted, so `IN` lists with duplicates
//!   silently shrink.
//! - A falsy bare argument (NULL, `""`, `0`, `0.0`, `false`) emits no
//!   placeholder and contributes no argument. This is a pass-through for
//!   omitted optional clauses; callers binding a legitimate zero or empty
//!   string must not route it through [`SqlBuilder::bind`].
//!
//! Collected arguments are stored as display-ready text, not native values;
//! callers relying on native types from a built statement must re-parse.

use crate::types::SqlParam;

/// A parameterized SQL text paired with its ordered argument list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    /// The SQL text, with one `?` per argument after list expansion
    pub sql: String,
    /// The positional arguments
    pub args: Vec<SqlParam>,
}

impl Statement {
    #[must_use]
    pub fn new(sql: impl Into<String>, args: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Borrow the statement as a `(sql, args)` pair.
    #[must_use]
    pub fn as_tuple(&self) -> (&str, &[SqlParam]) {
        (&self.sql, &self.args)
    }

    /// Consume the statement into its `(sql, args)` parts.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlParam>) {
        (self.sql, self.args)
    }
}

/// Anything the query helpers accept as a statement: raw SQL, a
/// `(sql, params)` pair, or a built [`Statement`].
pub trait IntoStatement {
    fn into_statement(self) -> Statement;
}

impl IntoStatement for Statement {
    fn into_statement(self) -> Statement {
        self
    }
}

impl IntoStatement for &Statement {
    fn into_statement(self) -> Statement {
        self.clone()
    }
}

impl IntoStatement for &str {
    fn into_statement(self) -> Statement {
        Statement::new(self, Vec::new())
    }
}

impl IntoStatement for String {
    fn into_statement(self) -> Statement {
        Statement::new(self, Vec::new())
    }
}

impl<S: Into<String>> IntoStatement for (S, Vec<SqlParam>) {
    fn into_statement(self) -> Statement {
        Statement::new(self.0, self.1)
    }
}

/// Comma-joined `?` placeholders, one per parameter.
///
/// A zero count yields the empty string (and `(` + `)` around it the empty
/// group most drivers reject; callers must avoid empty array arguments).
#[must_use]
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Fluent statement builder standing in for template-literal interpolation.
///
/// ```
/// use sql_conduit::template::SqlBuilder;
/// use sql_conduit::types::SqlParam;
///
/// let stmt = SqlBuilder::new()
///     .text("SELECT * FROM t WHERE id IN ")
///     .bind(SqlParam::List(vec![1.into(), 2.into(), 2.into(), 3.into()]))
///     .finish();
/// assert_eq!(stmt.sql, "SELECT * FROM t WHERE id IN (?,?,?)");
/// assert_eq!(stmt.args.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct SqlBuilder {
    sql: String,
    args: Vec<SqlParam>,
}

impl SqlBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a literal SQL fragment.
    #[must_use]
    pub fn text(mut self, fragment: impl AsRef<str>) -> Self {
        self.sql.push_str(fragment.as_ref());
        self
    }

    /// Bind one interpolated argument.
    ///
    /// Lists expand to a parenthesized placeholder group sized to their
    /// deduplicated length; falsy bare values are passed through untouched.
    #[must_use]
    pub fn bind(mut self, arg: impl Into<SqlParam>) -> Self {
        match arg.into() {
            SqlParam::List(values) => {
                let distinct = dedup_first_seen(values);
                self.sql.push('(');
                self.sql.push_str(&placeholders(distinct.len()));
                self.sql.push(')');
                self.args
                    .extend(distinct.iter().map(|v| SqlParam::Text(v.display_text())));
            }
            value if value.is_falsy() => {}
            value => {
                self.sql.push('?');
                self.args.push(SqlParam::Text(value.display_text()));
            }
        }
        self
    }

    /// Splice a previously built statement in place: its SQL verbatim, its
    /// arguments appended. No placeholder is emitted for the statement itself.
    #[must_use]
    pub fn embed(mut self, stmt: Statement) -> Self {
        self.sql.push_str(&stmt.sql);
        self.args
            .extend(stmt.args.iter().map(|v| SqlParam::Text(v.display_text())));
        self
    }

    #[must_use]
    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            args: self.args,
        }
    }
}

fn dedup_first_seen(values: Vec<SqlParam>) -> Vec<SqlParam> {
    let mut distinct: Vec<SqlParam> = Vec::with_capacity(values.len());
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    distinct
}
