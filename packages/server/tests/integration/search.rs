use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::common::{TestApp, routes};

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

fn result_ids(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

/// Four records with controlled metadata, mirroring name/type/size/date
/// combinations that exercise every filter.
async fn seed_catalog(app: &TestApp) -> (Uuid, Uuid, Uuid, Uuid) {
    let alpha = app
        .seed_record("name_alpha.txt", "text/plain", 10, at(2023, 1, 15, 10, 0, 0))
        .await;
    let beta = app
        .seed_record("name_beta.log", "text/plain", 20, at(2023, 1, 20, 12, 0, 0))
        .await;
    let gamma = app
        .seed_record("image_gamma.jpg", "image/jpeg", 30, at(2023, 1, 20, 18, 0, 0))
        .await;
    let delta = app
        .seed_record(
            "data_delta.dat",
            "application/octet-stream",
            10,
            at(2023, 1, 25, 9, 0, 0),
        )
        .await;
    (alpha, beta, gamma, delta)
}

mod filtering {
    use super::*;

    #[tokio::test]
    async fn no_filters_returns_everything_newest_first() {
        let app = TestApp::spawn().await;
        let (alpha, beta, gamma, delta) = seed_catalog(&app).await;

        let res = app.get(routes::SEARCH).await;
        assert_eq!(res.status, 200);
        assert_eq!(
            result_ids(&res.body),
            vec![
                delta.to_string(),
                gamma.to_string(),
                beta.to_string(),
                alpha.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn filename_matches_substring_case_insensitively() {
        let app = TestApp::spawn().await;
        let (alpha, beta, _, _) = seed_catalog(&app).await;

        let res = app.get(&format!("{}?filename=name_", routes::SEARCH)).await;
        assert_eq!(res.status, 200);
        let ids = result_ids(&res.body);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&alpha.to_string()));
        assert!(ids.contains(&beta.to_string()));

        let res = app.get(&format!("{}?filename=NAME_ALPHA", routes::SEARCH)).await;
        assert_eq!(result_ids(&res.body), vec![alpha.to_string()]);
    }

    #[tokio::test]
    async fn filename_full_match() {
        let app = TestApp::spawn().await;
        let (_, _, gamma, _) = seed_catalog(&app).await;

        let res = app
            .get(&format!("{}?filename=image_gamma.jpg", routes::SEARCH))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(result_ids(&res.body), vec![gamma.to_string()]);
    }

    #[tokio::test]
    async fn file_type_is_an_exact_match() {
        let app = TestApp::spawn().await;
        let (alpha, beta, _, _) = seed_catalog(&app).await;

        let res = app
            .get(&format!("{}?file_type=text/plain", routes::SEARCH))
            .await;
        assert_eq!(res.status, 200);
        let ids = result_ids(&res.body);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&alpha.to_string()));
        assert!(ids.contains(&beta.to_string()));

        // A prefix is not a match.
        let res = app.get(&format!("{}?file_type=text", routes::SEARCH)).await;
        assert_eq!(res.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn size_bounds_are_inclusive() {
        let app = TestApp::spawn().await;
        let (alpha, beta, gamma, delta) = seed_catalog(&app).await;

        let res = app.get(&format!("{}?size_min=15", routes::SEARCH)).await;
        let ids = result_ids(&res.body);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&beta.to_string()));
        assert!(ids.contains(&gamma.to_string()));

        let res = app.get(&format!("{}?size_max=15", routes::SEARCH)).await;
        let ids = result_ids(&res.body);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&alpha.to_string()));
        assert!(ids.contains(&delta.to_string()));

        // Exactly on the bound.
        let res = app
            .get(&format!("{}?size_min=20&size_max=20", routes::SEARCH))
            .await;
        assert_eq!(result_ids(&res.body), vec![beta.to_string()]);
    }

    #[tokio::test]
    async fn date_from_includes_that_day_onward() {
        let app = TestApp::spawn().await;
        let (_, beta, gamma, delta) = seed_catalog(&app).await;

        let res = app
            .get(&format!("{}?date_from=2023-01-20", routes::SEARCH))
            .await;
        assert_eq!(res.status, 200);
        let ids = result_ids(&res.body);
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&beta.to_string()));
        assert!(ids.contains(&gamma.to_string()));
        assert!(ids.contains(&delta.to_string()));
    }

    #[tokio::test]
    async fn date_to_includes_the_whole_day() {
        let app = TestApp::spawn().await;
        let (alpha, beta, gamma, delta) = seed_catalog(&app).await;

        let res = app
            .get(&format!("{}?date_to=2023-01-20", routes::SEARCH))
            .await;
        assert_eq!(res.status, 200);
        let ids = result_ids(&res.body);
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&alpha.to_string()));
        assert!(ids.contains(&beta.to_string()));
        // 18:00 on the bound day is included.
        assert!(ids.contains(&gamma.to_string()));
        assert!(!ids.contains(&delta.to_string()));
    }

    #[tokio::test]
    async fn date_to_boundary_is_end_of_day_exactly() {
        let app = TestApp::spawn().await;
        let last_second = app
            .seed_record("last.txt", "text/plain", 1, at(2023, 1, 20, 23, 59, 59))
            .await;
        let first_second_after = app
            .seed_record("after.txt", "text/plain", 1, at(2023, 1, 21, 0, 0, 1))
            .await;

        let res = app
            .get(&format!("{}?date_to=2023-01-20", routes::SEARCH))
            .await;
        let ids = result_ids(&res.body);
        assert!(ids.contains(&last_second.to_string()));
        assert!(!ids.contains(&first_second_after.to_string()));
    }

    #[tokio::test]
    async fn filters_combine_with_and() {
        let app = TestApp::spawn().await;
        let (alpha, beta, _, _) = seed_catalog(&app).await;

        let res = app
            .get(&format!(
                "{}?filename=name&date_to=2023-01-15",
                routes::SEARCH
            ))
            .await;
        assert_eq!(result_ids(&res.body), vec![alpha.to_string()]);

        let res = app
            .get(&format!(
                "{}?file_type=text/plain&size_min=15",
                routes::SEARCH
            ))
            .await;
        assert_eq!(result_ids(&res.body), vec![beta.to_string()]);
    }

    #[tokio::test]
    async fn no_match_is_an_empty_array() {
        let app = TestApp::spawn().await;
        seed_catalog(&app).await;

        let res = app
            .get(&format!("{}?filename=nonexistentfile", routes::SEARCH))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn blank_parameters_are_ignored() {
        let app = TestApp::spawn().await;
        seed_catalog(&app).await;

        let res = app
            .get(&format!("{}?size_min=&date_to=", routes::SEARCH))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 4);
    }
}

mod validation {
    use super::*;

    #[tokio::test]
    async fn unparseable_size_min_is_rejected() {
        let app = TestApp::spawn().await;
        seed_catalog(&app).await;

        let res = app
            .get(&format!("{}?size_min=notanumber", routes::SEARCH))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"].as_str().unwrap(), "Invalid size_min format");
    }

    #[tokio::test]
    async fn unparseable_size_max_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&format!("{}?size_max=anotherinvalid", routes::SEARCH))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"].as_str().unwrap(), "Invalid size_max format");
    }

    #[tokio::test]
    async fn malformed_dates_are_rejected_with_the_field_name() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&format!("{}?date_from=01-01-2023", routes::SEARCH))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(
            res.body["error"].as_str().unwrap(),
            "Invalid date_from format (YYYY-MM-DD)"
        );

        let res = app
            .get(&format!("{}?date_to=2023/01/01", routes::SEARCH))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(
            res.body["error"].as_str().unwrap(),
            "Invalid date_to format (YYYY-MM-DD)"
        );
    }

    #[tokio::test]
    async fn one_bad_parameter_fails_the_whole_request() {
        let app = TestApp::spawn().await;
        seed_catalog(&app).await;

        // Valid filename filter alongside a bad size: nothing is applied.
        let res = app
            .get(&format!(
                "{}?filename=name_&size_min=notanumber",
                routes::SEARCH
            ))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"].as_str().unwrap(), "Invalid size_min format");
    }
}

mod records_not_fingerprints {
    use super::*;

    /// Filters apply to each record's own metadata, not to the shared
    /// content: a duplicate with identical declared type and size matches
    /// alongside its original, one with different metadata does not.
    #[tokio::test]
    async fn duplicate_with_identical_metadata_is_included() {
        let app = TestApp::spawn().await;
        let content = b"ten bytes!".to_vec();

        let original = app
            .upload("name_alpha.txt", content.clone(), Some("text/plain"))
            .await;
        app.upload("other1.log", b"twenty bytes content".to_vec(), Some("text/plain"))
            .await;
        app.upload("other2.jpg", b"image-ish bytes".to_vec(), Some("image/jpeg"))
            .await;
        let duplicate = app
            .upload("name_alpha_copy.txt", content, Some("text/plain"))
            .await;
        assert!(duplicate.body["is_duplicate"].as_bool().unwrap());

        let res = app
            .get(&format!(
                "{}?file_type=text/plain&size_min=10&size_max=10",
                routes::SEARCH
            ))
            .await;
        assert_eq!(res.status, 200);
        let ids = result_ids(&res.body);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&original.body["id"].as_str().unwrap().to_string()));
        assert!(ids.contains(&duplicate.body["id"].as_str().unwrap().to_string()));
    }

    #[tokio::test]
    async fn duplicate_with_different_declared_type_is_excluded() {
        let app = TestApp::spawn().await;
        let content = b"ten bytes!".to_vec();

        let original = app
            .upload("name_alpha.txt", content.clone(), Some("text/plain"))
            .await;
        let duplicate = app
            .upload("name_alpha.raw", content, Some("application/x-raw"))
            .await;
        assert!(duplicate.body["is_duplicate"].as_bool().unwrap());

        let res = app
            .get(&format!(
                "{}?file_type=text/plain&size_min=10",
                routes::SEARCH
            ))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(
            result_ids(&res.body),
            vec![original.body["id"].as_str().unwrap().to_string()]
        );
    }
}
