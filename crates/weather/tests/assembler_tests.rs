//! Fan-out and validation policy of the ResponseAssembler, checked against
//! mockall doubles so every provider call is counted.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{candidate, forecast_days, historical_record, snapshot};
use mockall::mock;
use mockall::predicate::eq;
use nimbus_weather::glossary;
use nimbus_weather::{
    Description, ForecastDay, ForecastHorizon, Geocoder, HistoricalDate, HistoricalRecord,
    LocationCandidate, ResolutionFailure, ResponseAssembler, WeatherError, WeatherFetcher,
    WeatherSnapshot,
};

mock! {
    pub Geo {}

    #[async_trait]
    impl Geocoder for Geo {
        async fn resolve(&self, name: &str) -> Result<Vec<LocationCandidate>, WeatherError>;
    }
}

mock! {
    pub Fetcher {}

    #[async_trait]
    impl WeatherFetcher for Fetcher {
        async fn current(&self, candidate: &LocationCandidate) -> Result<WeatherSnapshot, WeatherError>;
        async fn forecast(
            &self,
            candidate: &LocationCandidate,
            horizon: ForecastHorizon,
        ) -> Result<Vec<ForecastDay>, WeatherError>;
        async fn historical(
            &self,
            candidate: &LocationCandidate,
            date: &HistoricalDate,
        ) -> Result<HistoricalRecord, WeatherError>;
    }
}

fn assembler(geo: MockGeo, fetcher: MockFetcher) -> ResponseAssembler {
    ResponseAssembler::new(Arc::new(geo), Arc::new(fetcher))
}

fn geo_returning(candidates: Vec<LocationCandidate>) -> MockGeo {
    let mut geo = MockGeo::new();
    geo.expect_resolve()
        .times(1)
        .returning(move |_| Ok(candidates.clone()));
    geo
}

#[tokio::test]
async fn test_now_single_candidate_scenario() {
    let geo = geo_returning(vec![candidate("101010100", "北京")]);
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_current()
        .withf(|c| c.id == "101010100")
        .times(1)
        .returning(|c| Ok(snapshot(&c.display_name)));

    let envelope = assembler(geo, fetcher).now("北京").await.unwrap();

    assert_eq!(envelope.data.len(), 1);
    assert_eq!(envelope.data[0].location, "北京");
    assert_eq!(envelope.description, Description::Flat(glossary::CURRENT));
}

#[tokio::test]
async fn test_now_fans_out_over_every_candidate() {
    let candidates = vec![
        candidate("101280601", "深圳"),
        candidate("101190401", "苏州"),
        candidate("101020100", "上海"),
        candidate("101010100", "北京"),
    ];
    let geo = geo_returning(candidates.clone());
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_current()
        .times(candidates.len())
        .returning(|c| Ok(snapshot(&c.display_name)));

    let envelope = assembler(geo, fetcher).now("ambiguous").await.unwrap();

    let locations: Vec<_> = envelope.data.iter().map(|s| s.location.as_str()).collect();
    assert_eq!(locations, vec!["深圳", "苏州", "上海", "北京"]);
}

#[tokio::test]
async fn test_now_no_match_is_resolution_failure() {
    let mut geo = MockGeo::new();
    geo.expect_resolve().times(1).returning(|name| {
        Err(WeatherError::ResolutionFailed {
            name: name.to_string(),
            reason: ResolutionFailure::NoMatch,
        })
    });
    let mut fetcher = MockFetcher::new();
    fetcher.expect_current().times(0);

    let err = assembler(geo, fetcher).now("Atlantis").await.unwrap_err();
    assert!(matches!(
        err,
        WeatherError::ResolutionFailed { reason: ResolutionFailure::NoMatch, .. }
    ));
}

#[tokio::test]
async fn test_now_empty_candidate_list_is_resolution_failure() {
    let geo = geo_returning(Vec::new());
    let mut fetcher = MockFetcher::new();
    fetcher.expect_current().times(0);

    let err = assembler(geo, fetcher).now("nowhere").await.unwrap_err();
    assert!(matches!(err, WeatherError::ResolutionFailed { name, .. } if name == "nowhere"));
}

#[tokio::test]
async fn test_forecast_uses_only_first_candidate() {
    let geo = geo_returning(vec![
        candidate("101020100", "上海"),
        candidate("101020600", "浦东"),
        candidate("101021300", "上海松江"),
    ]);
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_forecast()
        .withf(|c, h| c.id == "101020100" && *h == ForecastHorizon::SevenDays)
        .times(1)
        .returning(|_, _| Ok(forecast_days(7)));

    let envelope = assembler(geo, fetcher).forecast("上海", 7).await.unwrap();

    assert_eq!(envelope.data.location, "上海");
    assert_eq!(envelope.data.daily.len(), 7);
}

#[tokio::test]
async fn test_forecast_invalid_horizon_makes_no_calls() {
    let mut geo = MockGeo::new();
    geo.expect_resolve().times(0);
    let mut fetcher = MockFetcher::new();
    fetcher.expect_forecast().times(0);

    let err = assembler(geo, fetcher).forecast("上海", 5).await.unwrap_err();
    assert!(matches!(err, WeatherError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_past_uses_only_first_candidate() {
    let geo = geo_returning(vec![candidate("101010100", "北京"), candidate("101010200", "海淀")]);
    let expected_date = HistoricalDate::parse("20240101").unwrap();
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_historical()
        .withf(move |c, d| c.id == "101010100" && *d == expected_date)
        .times(1)
        .returning(|_, _| Ok(historical_record()));

    let envelope = assembler(geo, fetcher).past("北京", "20240101").await.unwrap();

    assert_eq!(envelope.data.location, "北京");
    assert_eq!(envelope.data.record.hourly.len(), 2);
    assert_eq!(envelope.description, Description::Sections(glossary::HISTORICAL));
}

#[tokio::test]
async fn test_past_malformed_date_makes_no_calls() {
    for bad in ["2024-01-01", "240101", "20241340", "yesterday"] {
        let mut geo = MockGeo::new();
        geo.expect_resolve().times(0);
        let mut fetcher = MockFetcher::new();
        fetcher.expect_historical().times(0);

        let err = assembler(geo, fetcher).past("东京", bad).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidArgument(_)), "{bad}");
    }
}

#[tokio::test]
async fn test_past_provider_rejection_propagates() {
    let geo = geo_returning(vec![candidate("1850147", "东京")]);
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_historical()
        .times(1)
        .returning(|_, _| Err(WeatherError::Rejected { code: "400".to_string() }));

    let err = assembler(geo, fetcher).past("东京", "20240101").await.unwrap_err();
    assert!(matches!(err, WeatherError::Rejected { code } if code == "400"));
}

#[tokio::test]
async fn test_now_fetch_failure_stops_fan_out() {
    let geo = geo_returning(vec![candidate("a", "A"), candidate("b", "B")]);
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_current()
        .with(eq(candidate("a", "A")))
        .times(1)
        .returning(|_| Err(WeatherError::Transport("connection reset".to_string())));

    let err = assembler(geo, fetcher).now("A").await.unwrap_err();
    assert!(matches!(err, WeatherError::Transport(_)));
}

#[tokio::test]
async fn test_rendered_envelope_is_self_describing() {
    let geo = geo_returning(vec![candidate("101010100", "北京")]);
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_current()
        .returning(|c| Ok(snapshot(&c.display_name)));

    let envelope = assembler(geo, fetcher).now("北京").await.unwrap();
    let rendered = envelope.render("Weather data related to 北京:").unwrap();
    let (_, body) = rendered.split_once('\n').unwrap();
    let value: serde_json::Value = serde_json::from_str(body).unwrap();

    // every data field is explained by the glossary
    for field in value["data"][0].as_object().unwrap().keys() {
        assert!(
            value["description"].get(field).is_some(),
            "no glossary entry for {field}"
        );
    }
}
