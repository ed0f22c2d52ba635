use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{CouponDiscountType, PointTransactionKind};
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::point::earn_points,
        handlers::point::grant_bonus,
        handlers::point::spend_points,
        handlers::point::refund_points,
        handlers::point::get_balance,
        handlers::point::get_statistics,
        handlers::point::get_transactions,
        handlers::coupon::grant_coupon,
        handlers::coupon::redeem_coupon,
        handlers::coupon::get_user_coupons,
    ),
    components(
        schemas(
            EarnPointsRequest,
            EarnPointsResponse,
            GrantBonusRequest,
            SpendPointsRequest,
            SpendPointsResponse,
            RefundPointsRequest,
            RefundPointsResponse,
            BalanceResponse,
            PointStatisticsResponse,
            PointTransactionQuery,
            PointTransactionResponse,
            PointTransactionKind,
            GrantCouponRequest,
            RedeemCouponRequest,
            RedeemCouponResponse,
            UserCouponQuery,
            UserCouponResponse,
            UserCouponStatus,
            CouponDiscountType,
            ApiError,
        )
    ),
    tags(
        (name = "points", description = "Loyalty point ledger API"),
        (name = "coupons", description = "Coupon redemption API"),
    ),
    info(
        title = "Loyalty Backend API",
        version = "1.0.0",
        description = "Loyalty point ledger and coupon redemption REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
