//! Contract every provider adapter must honor, run against the
//! deterministic no-op transport.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use equitick_core::{
    Adjust, BarsRequest, DateRange, EastmoneyAdapter, FinancialsRequest, NoopHttpClient, Operation,
    ProviderAdapter, QuoteRequest, SourceId, StatementKind, StockCode, TdxAdapter, TushareAdapter,
};

struct ProviderCase {
    id: SourceId,
    adapter: Arc<dyn ProviderAdapter>,
    supports_financials: bool,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: SourceId::Tdx,
            adapter: Arc::new(TdxAdapter::with_http_client(
                Arc::new(NoopHttpClient),
                "http://127.0.0.1:7709",
            )),
            supports_financials: false,
        },
        ProviderCase {
            id: SourceId::Eastmoney,
            adapter: Arc::new(EastmoneyAdapter::with_http_client(
                Arc::new(NoopHttpClient),
                "http://127.0.0.1:8080",
            )),
            supports_financials: true,
        },
        ProviderCase {
            id: SourceId::Tushare,
            adapter: Arc::new(TushareAdapter::with_http_client(
                Arc::new(NoopHttpClient),
                "contract-test-token",
            )),
            supports_financials: true,
        },
    ]
}

fn code() -> StockCode {
    StockCode::parse("600519").expect("valid code")
}

#[test]
fn every_adapter_reports_its_own_id() {
    for case in provider_cases() {
        assert_eq!(case.adapter.id(), case.id);
    }
}

#[test]
fn every_configured_adapter_serves_a_quote_frame() {
    for case in provider_cases() {
        assert!(
            case.adapter.is_configured(),
            "source '{}' should be configured for the contract run",
            case.id
        );

        let frame = block_on(case.adapter.quote(QuoteRequest::new(code())))
            .unwrap_or_else(|error| panic!("source '{}' quote failed: {error}", case.id));
        assert!(
            !frame.is_empty(),
            "source '{}' returned an empty quote frame",
            case.id
        );
    }
}

#[test]
fn every_configured_adapter_serves_bar_frames() {
    let range = DateRange::trailing_days(30);

    for case in provider_cases() {
        let frame = block_on(case.adapter.bars(BarsRequest::new(
            code(),
            range,
            Adjust::Forward,
        )))
        .unwrap_or_else(|error| panic!("source '{}' bars failed: {error}", case.id));
        assert!(
            frame.len() > 1,
            "source '{}' returned too few bars: {}",
            case.id,
            frame.len()
        );
    }
}

#[test]
fn financials_follow_the_declared_capability() {
    for case in provider_cases() {
        let declared = case.adapter.capabilities().supports(Operation::Financials);
        assert_eq!(
            declared, case.supports_financials,
            "source '{}': declared financials capability",
            case.id
        );

        let result = block_on(
            case.adapter
                .financials(FinancialsRequest::new(code(), StatementKind::Income)),
        );
        if declared {
            let frame =
                result.unwrap_or_else(|error| panic!("source '{}': {error}", case.id));
            assert!(!frame.is_empty(), "source '{}': empty financials", case.id);
        } else {
            let error = result.expect_err("undeclared capability must be rejected");
            assert_eq!(error.code(), "provider.invalid_request");
        }
    }
}

#[test]
fn quote_capability_is_declared_by_every_source() {
    for case in provider_cases() {
        assert!(
            case.adapter.capabilities().supports(Operation::Quote),
            "source '{}' must serve quotes",
            case.id
        );
        assert!(
            case.adapter.capabilities().supports(Operation::Bars),
            "source '{}' must serve bars",
            case.id
        );
    }
}

fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    let waker = noop_waker();
    let mut context = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(output) => return output,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}

fn noop_waker() -> Waker {
    // SAFETY: The vtable functions never dereference the data pointer and are no-op operations.
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

fn noop_raw_waker() -> RawWaker {
    RawWaker::new(std::ptr::null(), &NOOP_RAW_WAKER_VTABLE)
}

unsafe fn noop_raw_waker_clone(_: *const ()) -> RawWaker {
    noop_raw_waker()
}

unsafe fn noop_raw_waker_wake(_: *const ()) {}

unsafe fn noop_raw_waker_wake_by_ref(_: *const ()) {}

unsafe fn noop_raw_waker_drop(_: *const ()) {}

static NOOP_RAW_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    noop_raw_waker_clone,
    noop_raw_waker_wake,
    noop_raw_waker_wake_by_ref,
    noop_raw_waker_drop,
);
