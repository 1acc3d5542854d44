//! HTML fixtures shaped like the portal's pages, plus client helpers.

#![allow(dead_code)]

use canteen_client::{CanteenClient, CanteenConfig};
use wiremock::{MockServer, ResponseTemplate};

pub const RESTAURANT_ID: &str = "9a1f0c2e-0000-4000-8000-0000000000aa";
pub const SELECT_PATH: &str = "/card/Restaurant/RestaurantUserMenu/RestaurantUserSelect.aspx";
pub const MENU_PATH: &str = "/card/Restaurant/RestaurantUserMenu/RestaurantUserMenu.aspx";

/// Client with every endpoint on `server`.
pub fn client(server: &MockServer) -> CanteenClient {
    let config = CanteenConfig::local_mock(&server.uri()).unwrap();
    CanteenClient::new(config).unwrap()
}

/// 200 response with an HTML body.
pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into().into_bytes(), "text/html; charset=utf-8")
}

/// Decoded form fields of a received request body.
pub fn form_fields(body: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

pub fn form_value<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

pub fn hidden_fields(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="__VIEWSTATE" id="__VIEWSTATE" value="VS-{token}" />
<input type="hidden" name="__VIEWSTATEGENERATOR" id="__VIEWSTATEGENERATOR" value="GEN-{token}" />
<input type="hidden" name="__EVENTVALIDATION" id="__EVENTVALIDATION" value="EV-{token}" />"#
    )
}

// -- CAS / card system --------------------------------------------------------

pub fn cas_login_page(jsessionid: &str, lt: &str) -> String {
    format!(
        r#"<html><body>
<form id="fm1" class="fm-v clearfix" action="/cas/login;jsessionid={jsessionid}" method="post">
<input id="username" name="username" type="text" value="" />
<input id="password" name="password" type="password" value="" />
<input type="hidden" name="lt" value="{lt}" />
<input type="hidden" name="_eventId" value="submit" />
</form></body></html>"#
    )
}

pub fn cas_rejected_page(lt: &str) -> String {
    format!(
        r#"<html><body><div id="status" class="errors">用户名或密码错误</div>
<form id="fm1" method="post"><input type="hidden" name="lt" value="{lt}" /></form></body></html>"#
    )
}

pub fn cas_redirect_page() -> String {
    r#"<SCRIPT LANGUAGE="JavaScript">window.location.href="http://gzb.szsy.cn:4000/lcconsole/login!getSSOMessage.action";</SCRIPT>"#
        .to_string()
}

pub fn welcome_page(name: &str, balance: &str) -> String {
    format!(
        r#"<html><body><form id="form1">
<span id="LblUserName">当前用户：{name}</span>
<span id="LblBalance">账户余额：{balance}元</span>
</form></body></html>"#
    )
}

// -- Calendar -----------------------------------------------------------------

pub fn calendar_page(years: &[i32], year: i32, month: u32, dates: &[&str], token: &str) -> String {
    let year_options: String = years
        .iter()
        .map(|y| {
            let sel = if *y == year { r#" selected="selected""# } else { "" };
            format!(r#"<option{sel} value="{y}">{y}</option>"#)
        })
        .collect();
    let month_options: String = (1..=12)
        .map(|m| {
            let sel = if m == month { r#" selected="selected""# } else { "" };
            format!(r#"<option{sel} value="{m}">{m}</option>"#)
        })
        .collect();
    let links: String = dates
        .iter()
        .map(|d| {
            format!(r#"<td><a href="RestaurantUserMenu.aspx?Date={d}" target="RestaurantContent">{d}</a></td>"#)
        })
        .collect();
    format!(
        r#"<html><body><form method="post" action="RestaurantUserSelect.aspx" id="form1">
{fields}
<select name="DrplstYear1$DrplstControl" onchange="javascript:setTimeout('__doPostBack(\'DrplstYear1$DrplstControl\',\'\')', 0)" id="DrplstYear1_DrplstControl">{year_options}</select>
<select name="DrplstMonth1$DrplstControl" onchange="javascript:setTimeout('__doPostBack(\'DrplstMonth1$DrplstControl\',\'\')', 0)" id="DrplstMonth1_DrplstControl">{month_options}</select>
<table><tr>{links}</tr></table>
</form></body></html>"#,
        fields = hidden_fields(token),
    )
}

// -- Menu ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CourseRow {
    pub category: &'static str,
    pub name: &'static str,
    pub combo: bool,
    pub required: bool,
    pub price: &'static str,
    pub max: u32,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct MealTable {
    pub index: usize,
    pub do_not_order: bool,
    pub courses: Vec<CourseRow>,
}

/// Nine courses: index 0 is a combo, index 8 is required, max 5 elsewhere.
pub fn nine_courses() -> Vec<CourseRow> {
    let names = ["套餐A", "红烧肉", "清炒时蔬", "番茄炒蛋", "鱼香肉丝", "宫保鸡丁", "酸奶", "水果", "米饭"];
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| CourseRow {
            category: if i == 0 { "套餐" } else if i == 8 { "主食" } else { "菜" },
            name,
            combo: i == 0,
            required: i == 8,
            price: if i == 0 { "12.00" } else { "3.50" },
            max: if i == 8 { 1 } else { 5 },
            quantity: 0,
        })
        .collect()
}

pub fn standard_meals() -> Vec<MealTable> {
    (0..3)
        .map(|index| MealTable {
            index,
            do_not_order: false,
            courses: nine_courses(),
        })
        .collect()
}

fn pad() -> String {
    format!("\r\n{}", " ".repeat(24))
}

fn meal_table(meal: &MealTable, editable: bool) -> String {
    let m = meal.index;
    let mut rows = String::from(
        "<tr><th>编号</th><th>类别</th><th>菜名</th><th>套餐</th><th>必选</th><th>单价</th><th>最大份数</th><th>订购份数</th><th>订餐状态</th></tr>",
    );
    for (r, c) in meal.courses.iter().enumerate() {
        let quantity = if editable {
            format!(
                r#"<input name="Repeater1$GvReport_{m}$TxtNum_{r}" type="text" value="{q}" id="Repeater1_GvReport_{m}_TxtNum_{r}" style="width:30px;" />"#,
                q = c.quantity
            )
        } else {
            format!(r#"<span id="Repeater1_GvReport_{m}_LblQty_{r}">{}</span>"#, c.quantity)
        };
        rows.push_str(&format!(
            r#"<tr><td><span id="Repeater1_GvReport_{m}_LblNum_{r}">{num}</span></td><td>{cat}</td><td>{pad}{name}{pad}</td><td>{combo}</td><td>{req}</td><td>{price}</td><td>{max}</td><td>{quantity}</td><td>{status}</td></tr>"#,
            num = r + 1,
            cat = c.category,
            pad = pad(),
            name = c.name,
            combo = if c.combo { "套餐" } else { "&nbsp;" },
            req = if c.required { "必选" } else { "&nbsp;" },
            price = c.price,
            max = c.max,
            status = if c.quantity > 0 { "已订" } else { "未订" },
        ));
    }
    let n = meal.courses.len();
    if editable {
        rows.push_str(r#"<tr><td colspan="3">&nbsp;</td><td>合计:</td><td>&nbsp;</td><td>0.00</td></tr>"#);
    } else {
        rows.push_str(&format!(
            r#"<tr><td><span id="Repeater1_GvReport_{m}_LblNum_{n}">&nbsp;</span></td><td>&nbsp;</td><td>&nbsp;</td><td>&nbsp;</td><td>&nbsp;</td><td>&nbsp;</td><td>&nbsp;</td><td>&nbsp;</td><td>&nbsp;</td></tr>"#
        ));
    }
    let checked = if meal.do_not_order { r#" checked="checked""# } else { "" };
    format!(
        r#"<h3>{m}</h3><input id="Repeater1_CbkMealtimes_{m}" type="checkbox" name="Repeater1$ctl0{m}$CbkMealtimes"{checked} onclick="javascript:setTimeout('__doPostBack(\'Repeater1$ctl0{m}$CbkMealtimes\',\'\')', 0)" /><label for="Repeater1_CbkMealtimes_{m}">不订餐</label>
<table cellspacing="0" rules="all" border="1" id="Repeater1_GvReport_{m}" style="border-collapse:collapse;">{rows}</table>"#
    )
}

pub fn menu_page(editable: bool, meals: &[MealTable], token: &str) -> String {
    let tables: String = meals.iter().map(|m| meal_table(m, editable)).collect();
    let marker = if editable { "ShowOrderButton();" } else { "ShowOrderInfo();" };
    format!(
        r#"<html><body><form method="post" action="RestaurantUserMenu.aspx?Date=2015-09-30" id="form1">
{fields}
<select name="DrplstRestaurantBasis1$DrplstControl" id="DrplstRestaurantBasis1_DrplstControl"><option selected="selected" value="{RESTAURANT_ID}">高中部食堂</option></select>
{tables}
<script type="text/javascript">{marker}</script>
</form></body></html>"#,
        fields = hidden_fields(token),
    )
}

pub fn order_accepted_page() -> String {
    "0|<script>alert('订餐成功！');</script>".to_string()
}
