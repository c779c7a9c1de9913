//! Command handlers against the live mock server over real HTTP.

use powerguard_cli::{App, UreqTransport};
use powerguard_core::{PowerGenFilter, PowerGuardClient, ProductionFilter};

const TOKEN: &str = "cli-token";

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, mock_server::AppState::seeded(TOKEN)).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn app(base: &str, token: &str) -> App<UreqTransport> {
    App::new(PowerGuardClient::new(base, token).unwrap(), UreqTransport::new(None))
}

#[test]
fn plant_list_shows_seeded_plant_with_group_name() {
    let base = start_server();
    let out = app(&base, TOKEN).plants().unwrap();
    let row = out.lines().nth(2).unwrap();
    assert!(row.contains("S1"));
    assert!(row.contains("East"));
}

#[test]
fn bad_token_reports_error() {
    let base = start_server();
    let err = app(&base, "wrong").groups().unwrap_err();
    assert!(err.to_string().contains("unauthorized"));
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = app(&format!("http://{addr}"), TOKEN).groups().unwrap_err();
    assert!(err.to_string().contains("transport error"));
}

#[test]
fn update_reading_then_list_shows_new_value() {
    let base = start_server();
    let app = app(&base, TOKEN);
    let filter = PowerGenFilter {
        date: None,
        loggers: vec!["L1".to_string()],
    };

    let out = app.update_power_gen(&filter, 2, "321.5".to_string()).unwrap();
    assert!(out.lines().nth(3).unwrap().contains("321.5"));

    let listed = app.power_gen(&filter).unwrap();
    let second = listed.lines().nth(3).unwrap();
    assert!(second.contains("2024-05-02"));
    assert!(second.contains("321.5"));
    assert!(second.contains('✔'));
}

#[test]
fn update_production_for_filtered_plant() {
    let base = start_server();
    let app = app(&base, TOKEN);
    let filter = ProductionFilter {
        date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
        plant_ids: vec!["P-100".to_string()],
    };
    let out = app.update_production(&filter, 1, "7000".to_string()).unwrap();
    assert!(out.lines().nth(2).unwrap().contains("7000"));
}

#[test]
fn add_group_then_plant_referencing_it() {
    let base = start_server();
    let app = app(&base, TOKEN);

    let out = app.add_group("North").unwrap();
    let id = out.lines().nth(2).unwrap().split_whitespace().next().unwrap().to_string();

    let fields: Vec<(String, String)> = [
        ("system_id", "S9"),
        ("system_name", "Hilltop"),
        ("customer_name", "Acme"),
        ("country_name", "Nepal"),
        ("resource", "HYDRO"),
        ("group", id.as_str()),
        ("capacity_dc", "10"),
        ("latitude", "28"),
        ("longitude", "84"),
        ("altitude", "900"),
        ("azimuth", "0"),
        ("tilt", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let out = app.add_plant(&fields).unwrap();
    let row = out.lines().nth(2).unwrap();
    assert!(row.contains("S9"));
    assert!(row.contains("North"));
    assert!(row.contains("28.000000"));
}

#[test]
fn unknown_resource_choice_is_rejected_before_posting() {
    let base = start_server();
    let fields = vec![("resource".to_string(), "NUCLEAR".to_string())];
    let err = app(&base, TOKEN).add_plant(&fields).unwrap_err();
    assert!(err.to_string().contains("Resource: Select a valid option"));
}

#[test]
fn non_numeric_reading_is_rejected_and_list_still_loads() {
    let base = start_server();
    let app = app(&base, TOKEN);
    let filter = PowerGenFilter::default();

    let err = app.update_power_gen(&filter, 1, "abc".to_string()).unwrap_err();
    assert!(format!("{err:#}").contains("A valid number is required"));

    let listed = app.power_gen(&filter).unwrap();
    assert!(listed.contains("198.75"));
    assert!(listed.contains("210.40"));
}

#[test]
fn add_category_then_list() {
    let base = start_server();
    let app = app(&base, TOKEN);

    let out = app.add_category("Weather").unwrap();
    assert!(out.lines().nth(2).unwrap().ends_with("Weather"));

    let listed = app.categories().unwrap();
    let names: Vec<&str> = listed
        .lines()
        .skip(2)
        .filter_map(|l| l.split_whitespace().nth(1))
        .collect();
    assert_eq!(names, vec!["Inverter", "Weather"]);
}
