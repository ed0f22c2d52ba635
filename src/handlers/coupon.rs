use crate::models::*;
use crate::services::CouponService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/coupons/grant",
    tag = "coupons",
    request_body = GrantCouponRequest,
    responses(
        (status = 200, description = "Coupon claim created", body = UserCouponResponse),
        (status = 404, description = "No active coupon with this code")
    )
)]
pub async fn grant_coupon(
    coupon_service: web::Data<CouponService>,
    request: web::Json<GrantCouponRequest>,
) -> Result<HttpResponse> {
    match coupon_service.grant(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/redeem",
    tag = "coupons",
    request_body = RedeemCouponRequest,
    responses(
        (status = 200, description = "Coupon redeemed", body = RedeemCouponResponse),
        (status = 409, description = "Coupon already redeemed or expired"),
        (status = 400, description = "Order does not satisfy the coupon terms")
    )
)]
pub async fn redeem_coupon(
    coupon_service: web::Data<CouponService>,
    request: web::Json<RedeemCouponRequest>,
) -> Result<HttpResponse> {
    match coupon_service.redeem(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/users/{user_id}",
    tag = "coupons",
    params(
        ("user_id" = i64, Path, description = "User id"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "available/used/expired")
    ),
    responses(
        (status = 200, description = "User coupon claims")
    )
)]
pub async fn get_user_coupons(
    coupon_service: web::Data<CouponService>,
    path: web::Path<i64>,
    query: web::Query<UserCouponQuery>,
) -> Result<HttpResponse> {
    match coupon_service
        .list_user_coupons(path.into_inner(), &query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coupons")
            .route("/grant", web::post().to(grant_coupon))
            .route("/redeem", web::post().to(redeem_coupon))
            .route("/users/{user_id}", web::get().to(get_user_coupons)),
    );
}
