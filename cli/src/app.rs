//! Command handlers. Each one drives a core controller through the
//! transport and returns the rendered view.

use anyhow::{anyhow, bail, Context};
use powerguard_core::{
    AddRecord, ApiError, ChoiceSource, Creatable, EditController, Editable, FetchOutcome,
    ListQuery, LoggerCategory, LoggerPlantGroup, LoggerPowerGen, PowerGenFilter, PowerGuardClient,
    PowerPlantDetail, ProductionFilter, Resource, ResourceFetch, UtilityDailyProduction,
    UtilityPlant,
};
use tracing::warn;

use crate::transport::Transport;
use crate::views;

/// Draft for an inline edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    /// Value for the single editable column of readings and productions.
    Value(String),
    /// `field=value` assignments for multi-column rows.
    Fields(Vec<(String, String)>),
}

pub struct App<T> {
    client: PowerGuardClient,
    transport: T,
}

impl<T: Transport> App<T> {
    pub fn new(client: PowerGuardClient, transport: T) -> Self {
        Self { client, transport }
    }

    fn fetch<R: Resource>(&self, query: ListQuery) -> Result<Vec<R>, ApiError> {
        let mut fetch = ResourceFetch::<R>::new(query);
        let ticket = fetch.start(&self.client);
        let completion = self.transport.execute(&ticket.request);
        match fetch.complete(&self.client, ticket.id, completion) {
            FetchOutcome::Applied => Ok(fetch.data().map(<[R]>::to_vec).unwrap_or_default()),
            FetchOutcome::Failed | FetchOutcome::Stale => Err(fetch
                .error()
                .cloned()
                .unwrap_or_else(|| ApiError::Transport("request was superseded".to_string()))),
        }
    }

    fn list<R: Resource>(&self, query: ListQuery) -> anyhow::Result<Vec<R>> {
        self.fetch(query).map_err(|err| anyhow!(views::fetch_error(&err)))
    }

    /// Groups label the plant table; a failure leaves the column at N/A.
    fn groups_or_empty(&self) -> Vec<LoggerPlantGroup> {
        self.fetch(ListQuery::new()).unwrap_or_else(|err| {
            warn!(error = %err, "group names unavailable");
            Vec::new()
        })
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    pub fn plants(&self) -> anyhow::Result<String> {
        let rows: Vec<PowerPlantDetail> = self.list(ListQuery::new())?;
        Ok(views::plants(&rows, &self.groups_or_empty(), None))
    }

    pub fn power_gen(&self, filter: &PowerGenFilter) -> anyhow::Result<String> {
        let mut rows: Vec<LoggerPowerGen> = self.list(ListQuery::from(filter))?;
        powerguard_core::resource::sort_for_display(&mut rows);
        Ok(views::power_gen(&rows, None))
    }

    pub fn productions(&self, filter: &ProductionFilter) -> anyhow::Result<String> {
        let mut rows: Vec<UtilityDailyProduction> = self.list(ListQuery::from(filter))?;
        powerguard_core::resource::sort_for_display(&mut rows);
        Ok(views::productions(&rows, None))
    }

    pub fn groups(&self) -> anyhow::Result<String> {
        let rows: Vec<LoggerPlantGroup> = self.list(ListQuery::new())?;
        Ok(views::groups(&rows))
    }

    pub fn categories(&self) -> anyhow::Result<String> {
        let mut rows: Vec<LoggerCategory> = self.list(ListQuery::new())?;
        powerguard_core::resource::sort_for_display(&mut rows);
        Ok(views::categories(&rows))
    }

    pub fn utility_plants(&self) -> anyhow::Result<String> {
        let rows: Vec<UtilityPlant> = self.list(ListQuery::new())?;
        Ok(views::utility_plants(&rows))
    }

    pub fn choices(&self) -> anyhow::Result<String> {
        let form = self.load_form::<PowerPlantDetail>();
        if let Some(err) = form.reference_error() {
            bail!(views::fetch_error(err));
        }
        Ok(views::choices(form.options("resource")))
    }

    // -----------------------------------------------------------------------
    // Edit
    // -----------------------------------------------------------------------

    /// Load the collection, edit 1-based display row `row` and commit it.
    /// Returns the controller so the caller can render the result.
    fn edit<R: Editable>(
        &self,
        query: ListQuery,
        row: usize,
        draft: &Draft,
    ) -> anyhow::Result<EditController<R>> {
        let index = row
            .checked_sub(1)
            .context("rows are numbered from 1")?;
        let rows: Vec<R> = self.list(query)?;

        let mut edit = EditController::new();
        edit.sync(&rows);
        edit.handle_edit(index)
            .with_context(|| format!("no row {row} ({} rows listed)", edit.rows().len()))?;
        match draft {
            Draft::Value(value) => {
                edit.set_value(value);
            }
            Draft::Fields(fields) => {
                for (field, value) in fields {
                    edit.handle_input_change(field, value)?;
                }
            }
        }

        let Some(pending) = edit.handle_save(&self.client).context("error updating data")? else {
            return Ok(edit);
        };
        let completion = self.transport.execute(&pending.ticket.request);
        if let Err(err) = edit.complete_save(&self.client, &pending, completion) {
            return Err(anyhow!(err).context("error updating data"));
        }
        Ok(edit)
    }

    pub fn edit_plant(&self, row: usize, fields: Vec<(String, String)>) -> anyhow::Result<String> {
        let edit = self.edit::<PowerPlantDetail>(ListQuery::new(), row, &Draft::Fields(fields))?;
        Ok(views::plants(edit.rows(), &self.groups_or_empty(), edit.session()))
    }

    pub fn update_power_gen(
        &self,
        filter: &PowerGenFilter,
        row: usize,
        value: String,
    ) -> anyhow::Result<String> {
        let edit = self.edit::<LoggerPowerGen>(ListQuery::from(filter), row, &Draft::Value(value))?;
        Ok(views::power_gen(edit.rows(), edit.session()))
    }

    pub fn update_production(
        &self,
        filter: &ProductionFilter,
        row: usize,
        value: String,
    ) -> anyhow::Result<String> {
        let edit =
            self.edit::<UtilityDailyProduction>(ListQuery::from(filter), row, &Draft::Value(value))?;
        Ok(views::productions(edit.rows(), edit.session()))
    }

    // -----------------------------------------------------------------------
    // Add
    // -----------------------------------------------------------------------

    /// A fresh form with its select options loaded. Reference failures are
    /// left on the form for the caller to report.
    fn load_form<R: Creatable>(&self) -> AddRecord<R> {
        let mut form = AddRecord::<R>::new();
        for reference in form.reference_requests(&self.client) {
            let completion = self.transport.execute(&reference.ticket.request);
            if let Err(err) =
                form.complete_reference(&self.client, reference.source, reference.ticket.id, completion)
            {
                let what = match reference.source {
                    ChoiceSource::ResourceChoices => "resource choices",
                    ChoiceSource::PlantGroups => "plant groups",
                };
                warn!(error = %err, "failed to load {what}");
            }
        }
        form
    }

    fn add<R: Creatable>(&self, fields: &[(String, String)]) -> anyhow::Result<R> {
        let mut form = self.load_form::<R>();
        for (name, raw) in fields {
            form.set_field(name, raw)?;
        }

        let request = match form.submit(&self.client) {
            Ok(request) => request,
            Err(ApiError::Validation(errors)) => {
                bail!("form is incomplete:\n{}", views::form_errors(form.schema(), &errors));
            }
            Err(err) => return Err(err.into()),
        };
        let completion = self.transport.execute(&request);
        match form.complete_submit(&self.client, completion) {
            Ok(created) => Ok(created),
            Err(err) if !form.field_errors().is_empty() => Err(anyhow!(err).context(format!(
                "{}\n{}",
                views::SAVE_FAILED,
                views::form_errors(form.schema(), form.field_errors())
            ))),
            Err(err) => Err(anyhow!(err).context(views::SAVE_FAILED)),
        }
    }

    pub fn add_plant(&self, fields: &[(String, String)]) -> anyhow::Result<String> {
        let created: PowerPlantDetail = self.add(fields)?;
        Ok(views::plants(&[created], &self.groups_or_empty(), None))
    }

    pub fn add_group(&self, name: &str) -> anyhow::Result<String> {
        let created: LoggerPlantGroup = self.add(&[("group_name".to_string(), name.to_string())])?;
        Ok(views::groups(&[created]))
    }

    pub fn add_category(&self, name: &str) -> anyhow::Result<String> {
        let created: LoggerCategory =
            self.add(&[("category_name".to_string(), name.to_string())])?;
        Ok(views::categories(&[created]))
    }

    pub fn add_utility_plant(&self, plant_id: &str) -> anyhow::Result<String> {
        let created: UtilityPlant = self.add(&[("plant_id".to_string(), plant_id.to_string())])?;
        Ok(views::utility_plants(&[created]))
    }
}
