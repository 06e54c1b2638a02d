use axum::{
    extract::{Path, Query},
    response::{Redirect, Response},
    Form,
};
use serde::Deserialize;
use service_core::fineract::clients::{Client, ClientCommand, ClientQuery, ClientRequest, LEGAL_FORM_PERSON};
use validator::{Validate, ValidationError};

use crate::forms::validators::{validate_date, validate_id};
use crate::forms::{
    blank_as_none, checkbox, parse_date, parse_id, parse_optional_date, parse_optional_id,
    FieldKind, FormErrors, FormField, FormView,
};
use crate::handlers::{confirm, failure, form_errors, outcome, reject, render, PageError, PAGE_SIZE};
use crate::models::user::AuthUser;
use crate::views::{date, opt, optional, options, Cell, Facts, Link, Page, Pager, Row, Table};

#[derive(Debug, Deserialize, Default)]
pub struct ClientSearch {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
#[validate(schema(function = "activation_needs_date"))]
pub struct ClientForm {
    #[validate(custom(function = "validate_id"))]
    pub office_id: String,
    #[validate(length(min = 1, max = 50, message = "First name is required"))]
    pub firstname: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required"))]
    pub lastname: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub external_id: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub mobile_no: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(email(message = "Enter a valid email address"))]
    pub email_address: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_id"))]
    pub staff_id: Option<String>,
    #[serde(deserialize_with = "checkbox")]
    pub active: bool,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_date"))]
    pub activation_date: Option<String>,
}

fn activation_needs_date(form: &ClientForm) -> Result<(), ValidationError> {
    if form.active && form.activation_date.is_none() {
        let mut err = ValidationError::new("activation_date");
        err.message = Some("An active client needs an activation date".into());
        return Err(err);
    }
    Ok(())
}

impl ClientForm {
    fn from_client(client: &Client) -> Self {
        Self {
            office_id: opt(client.office_id),
            firstname: client.firstname.clone().unwrap_or_default(),
            lastname: client.lastname.clone().unwrap_or_default(),
            external_id: client.external_id.clone(),
            mobile_no: client.mobile_no.clone(),
            email_address: client.email_address.clone(),
            staff_id: client.staff_id.map(|id| id.to_string()),
            active: client.active,
            activation_date: client.activation_date.map(|d| date(Some(d))),
        }
    }

    fn to_request(&self, creating: bool) -> Result<ClientRequest, PageError> {
        let activation_date = parse_optional_date("Activation date", self.activation_date.as_deref())?;
        Ok(ClientRequest {
            office_id: Some(parse_id("Office", &self.office_id)?),
            firstname: self.firstname.trim().to_string(),
            lastname: self.lastname.trim().to_string(),
            external_id: self.external_id.clone(),
            mobile_no: self.mobile_no.clone(),
            email_address: self.email_address.clone(),
            staff_id: parse_optional_id("Staff", self.staff_id.as_deref())?,
            legal_form_id: creating.then_some(LEGAL_FORM_PERSON),
            active: creating.then_some(self.active),
            activation_date: if creating && self.active { activation_date } else { None },
            submitted_on_date: creating.then(|| chrono::Local::now().date_naive()),
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandForm {
    pub command: String,
    #[validate(custom(function = "validate_date"))]
    pub date: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(custom(function = "validate_id"))]
    pub reason_id: Option<String>,
}

pub async fn list(user: AuthUser, Query(search): Query<ClientSearch>) -> Result<Response, PageError> {
    let query = ClientQuery {
        display_name: Some(search.q.clone()),
        ..ClientQuery::page(search.offset, PAGE_SIZE)
    };
    let clients = user.client.list_clients(&query).await?;

    let base = if search.q.trim().is_empty() {
        "/clients?".to_string()
    } else {
        format!("/clients?q={}&", urlencoding::encode(search.q.trim()))
    };
    let pager = Pager::new(&base, search.offset, PAGE_SIZE, clients.items.len(), clients.total);

    let table = Table::new(&["Account", "Name", "Office", "Status", "Mobile"])
        .empty("No clients match")
        .rows(clients.items.iter().map(|c| {
            Row::new(vec![
                opt(c.account_no.as_deref()).into(),
                Cell::link(c.display_name.clone(), format!("/clients/{}", c.id)),
                opt(c.office_name.as_deref()).into(),
                c.status.value.clone().into(),
                opt(c.mobile_no.as_deref()).into(),
            ])
        }))
        .pager(pager);

    let search_form = FormView::new("Search", "/clients/search")
        .field(FormField::text("q", "Name").value(&search.q))
        .submit("Search");

    let page = Page::new("clients", "Clients")
        .action(Link::get("New client", "/clients/new"))
        .form(search_form)
        .table(table);
    Ok(render(&user, page).await)
}

/// The search box posts here so the listing keeps a bookmarkable GET URL.
pub async fn search(Form(search): Form<ClientSearch>) -> Redirect {
    let q = search.q.trim();
    if q.is_empty() {
        Redirect::to("/clients")
    } else {
        Redirect::to(&format!("/clients?q={}", urlencoding::encode(q)))
    }
}

async fn form_page(
    user: &AuthUser,
    title: &str,
    action: &str,
    form: &ClientForm,
    errors: &FormErrors,
    creating: bool,
) -> Result<Page, PageError> {
    let (offices, staff) = tokio::join!(user.client.list_offices(), user.client.list_staff(None));
    let offices = options(offices?, |o| (o.id, o.name_decorated.unwrap_or(o.name)));
    let staff = optional(options(staff?, |s| (s.id, s.display_name)));

    let mut view = FormView::new(title, action)
        .field(FormField::select("officeId", "Office", offices, &form.office_id).required())
        .field(FormField::text("firstname", "First name").value(&form.firstname).required())
        .field(FormField::text("lastname", "Last name").value(&form.lastname).required())
        .field(FormField::text("externalId", "External id").value(opt(form.external_id.as_deref())))
        .field(FormField::text("mobileNo", "Mobile number").value(opt(form.mobile_no.as_deref())))
        .field(
            FormField::text("emailAddress", "Email")
                .kind(FieldKind::Email)
                .value(opt(form.email_address.as_deref())),
        )
        .field(FormField::select(
            "staffId",
            "Loan officer",
            staff,
            form.staff_id.as_deref().unwrap_or(""),
        ));
    if creating {
        view = view
            .field(FormField::checkbox("active", "Activate now", form.active))
            .field(
                FormField::date("activationDate", "Activation date")
                    .value(opt(form.activation_date.as_deref())),
            );
    }
    let view = view.cancel("/clients").with_errors(errors);
    Ok(Page::new("clients", title).form(view))
}

pub async fn new(user: AuthUser) -> Result<Response, PageError> {
    let page = form_page(&user, "New client", "/clients", &ClientForm::default(), &FormErrors::default(), true).await?;
    Ok(render(&user, page).await)
}

pub async fn create(user: AuthUser, Form(form): Form<ClientForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.create_client(&form.to_request(true)?).await {
            Ok(result) => {
                let to = result
                    .client_id
                    .or(result.resource_id)
                    .map(|id| format!("/clients/{id}"))
                    .unwrap_or_else(|| "/clients".to_string());
                return Ok(user.done("Client created", &to).await);
            }
            Err(e) => form_errors(e)?,
        },
    };
    let page = form_page(&user, "New client", "/clients", &form, &errors, true).await?;
    Ok(reject(&user, &errors, page).await)
}

pub async fn show(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let client = user.client.get_client(id).await?;

    let facts = Facts::new()
        .item("Account", opt(client.account_no.as_deref()))
        .item("External id", opt(client.external_id.as_deref()))
        .item("Office", opt(client.office_name.as_deref()))
        .item("Status", client.status.value.clone())
        .item("Activation date", date(client.activation_date))
        .item("Mobile", opt(client.mobile_no.as_deref()))
        .item("Email", opt(client.email_address.as_deref()));

    let commands = ClientCommand::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), c.as_str().to_string()));
    let today = chrono::Local::now().date_naive();
    let command_form = FormView::new("Lifecycle", format!("/clients/{id}/command"))
        .field(FormField::select("command", "Command", commands, ""))
        .field(FormField::date("date", "Date").value(date(Some(today))).required())
        .field(
            FormField::number("reasonId", "Reason code id")
                .help("Required by Fineract for close, reject and withdraw"),
        )
        .submit("Run");

    let page = Page::new("clients", client.display_name.clone())
        .action(Link::get("Edit", format!("/clients/{id}/edit")))
        .action(Link::get("Data tables", format!("/datatables/entries?apptable=m_client&entityId={id}")))
        .action(Link::get("Delete", format!("/clients/{id}/delete")).danger())
        .facts(facts)
        .form(command_form);
    Ok(render(&user, page).await)
}

pub async fn edit(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let client = user.client.get_client(id).await?;
    let form = ClientForm::from_client(&client);
    let page = form_page(&user, "Edit client", &format!("/clients/{id}"), &form, &FormErrors::default(), false).await?;
    Ok(render(&user, page).await)
}

pub async fn update(user: AuthUser, Path(id): Path<i64>, Form(form): Form<ClientForm>) -> Result<Response, PageError> {
    let errors = match form.validate() {
        Err(e) => FormErrors::from(&e),
        Ok(()) => match user.client.update_client(id, &form.to_request(false)?).await {
            Ok(_) => return Ok(user.done("Client updated", &format!("/clients/{id}")).await),
            Err(e) => form_errors(e)?,
        },
    };
    let page = form_page(&user, "Edit client", &format!("/clients/{id}"), &form, &errors, false).await?;
    Ok(reject(&user, &errors, page).await)
}

pub async fn confirm_delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    let client = user.client.get_client(id).await?;
    Ok(confirm(
        &user,
        "clients",
        "Delete client",
        format!("Delete {}? Only pending clients can be deleted.", client.display_name),
        &format!("/clients/{id}/delete"),
        &format!("/clients/{id}"),
    )
    .await)
}

pub async fn delete(user: AuthUser, Path(id): Path<i64>) -> Result<Response, PageError> {
    match user.client.delete_client(id).await {
        Ok(_) => Ok(user.done("Client deleted", "/clients").await),
        Err(e) => failure(&user, e, &format!("/clients/{id}")).await,
    }
}

pub async fn command(user: AuthUser, Path(id): Path<i64>, Form(form): Form<CommandForm>) -> Result<Response, PageError> {
    let back = format!("/clients/{id}");
    let Some(command) = ClientCommand::parse(&form.command) else {
        return Ok(user.failed("Choose a command", &back).await);
    };
    if let Err(e) = form.validate() {
        return Ok(user.failed(FormErrors::from(&e).summary(), &back).await);
    }
    let date = parse_date("Date", &form.date)?;
    let reason_id = parse_optional_id("Reason", form.reason_id.as_deref())?;
    let result = user.client.client_command(id, command, date, reason_id).await;
    outcome(&user, result, format!("Client {}", past_tense(command)), &back).await
}

fn past_tense(command: ClientCommand) -> &'static str {
    match command {
        ClientCommand::Activate => "activated",
        ClientCommand::Close => "closed",
        ClientCommand::Reject => "rejected",
        ClientCommand::Withdraw => "withdrawn",
        ClientCommand::Reactivate => "reactivated",
    }
}
