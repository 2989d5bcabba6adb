//! Calendar-date wire format shared by DTOs and views (`YYYY-MM-DD`).

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");
