use crate::{
    api::{deduction, payment_type, payroll_run, staff, tax_settings},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let run_limiter = Arc::new(build_limiter(config.rate_run_per_min));
    let default_limiter = Arc::new(build_limiter(config.rate_default_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/run")
                    .wrap(run_limiter)
                    // /run
                    .service(
                        web::resource("")
                            .route(web::post().to(payroll_run::create_run))
                            .route(web::get().to(payroll_run::list_runs)),
                    )
                    // /run/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(payroll_run::get_run))
                            .route(web::delete().to(payroll_run::delete_run)),
                    )
                    // lifecycle transitions
                    .service(
                        web::resource("/{id}/process")
                            .route(web::post().to(payroll_run::process_run)),
                    )
                    .service(
                        web::resource("/{id}/submit").route(web::put().to(payroll_run::submit_run)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(payroll_run::approve_run)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(payroll_run::reject_run)),
                    )
                    .service(
                        web::resource("/{id}/reset").route(web::put().to(payroll_run::reset_run)),
                    ),
            )
            .service(
                web::scope("/payment-type")
                    .wrap(default_limiter.clone())
                    .service(
                        web::resource("")
                            .route(web::get().to(payment_type::list_payment_types))
                            .route(web::post().to(payment_type::create_payment_type)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(payment_type::delete_payment_type)),
                    ),
            )
            .service(
                web::scope("/deduction-type")
                    .wrap(default_limiter.clone())
                    .service(
                        web::resource("")
                            .route(web::get().to(deduction::list_deduction_types))
                            .route(web::post().to(deduction::create_deduction_type)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(deduction::delete_deduction_type)),
                    ),
            )
            .service(
                web::scope("/deduction").wrap(default_limiter.clone()).service(
                    web::resource("")
                        .route(web::get().to(deduction::list_deductions))
                        .route(web::post().to(deduction::create_deduction)),
                ),
            )
            .service(
                web::scope("/staff")
                    .wrap(default_limiter.clone())
                    .service(
                        web::resource("")
                            .route(web::post().to(staff::create_staff))
                            .route(web::get().to(staff::list_staff)),
                    )
                    .service(
                        web::resource("/{id}/payment-config")
                            .route(web::put().to(staff::update_payment_config)),
                    ),
            )
            .service(
                web::scope("/tax-settings").wrap(default_limiter).service(
                    web::resource("")
                        .route(web::get().to(tax_settings::get_tax_settings))
                        .route(web::put().to(tax_settings::update_tax_settings)),
                ),
            ),
    );
}
