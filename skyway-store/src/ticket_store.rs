use async_trait::async_trait;
use skyway_core::booking::FlightSegment;
use skyway_core::itinerary::Itinerary;
use skyway_core::ticketing::Ticketing;
use skyway_core::{CoreError, CoreResult};
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// Plain-text ticket documents on the local filesystem, laid out as
/// `{root}/{booking_id}/{segment_id}.txt` and served from `public_base_url`.
#[derive(Clone)]
pub struct FileTicketStore {
    root: PathBuf,
    public_base_url: String,
}

impl FileTicketStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn document_name(segment_id: Option<Uuid>) -> String {
        match segment_id {
            Some(id) => format!("{}.txt", id),
            None => "booking.txt".to_string(),
        }
    }

    fn path_for(&self, booking_id: Uuid, segment_id: Option<Uuid>) -> PathBuf {
        self.root.join(booking_id.to_string()).join(Self::document_name(segment_id))
    }

    fn url_for(&self, booking_id: Uuid, segment_id: Option<Uuid>) -> String {
        format!("{}/{}/{}", self.public_base_url, booking_id, Self::document_name(segment_id))
    }
}

fn io_error(err: std::io::Error) -> CoreError {
    CoreError::Upstream(format!("Ticket storage failed: {}", err))
}

fn render_segment(out: &mut String, itinerary: &Itinerary, segment: &FlightSegment) {
    let leg = if segment.is_return { "RETURN" } else { "OUTBOUND" };
    let _ = writeln!(out, "{} FLIGHT  [{}]", leg, segment.cabin_class);
    match itinerary.flight_for(segment) {
        Some(flight) => {
            let _ = writeln!(out, "  {} {}", flight.airline.name, flight.flight_number);
            let _ = writeln!(
                out,
                "  {} ({}) -> {} ({})",
                flight.departure_airport.city,
                flight.departure_airport.code,
                flight.arrival_airport.city,
                flight.arrival_airport.code
            );
            let _ = writeln!(out, "  Departs: {}", flight.departure_time.format("%Y-%m-%d %H:%M UTC"));
            let _ = writeln!(out, "  Arrives: {}", flight.arrival_time.format("%Y-%m-%d %H:%M UTC"));
        }
        None => {
            let _ = writeln!(out, "  Flight {}", segment.flight_id);
        }
    }
    let _ = writeln!(out, "  Fare: {:.2}", segment.fare_amount);
}

/// Text body of a ticket. With a segment id only that leg is printed.
pub fn render_ticket(itinerary: &Itinerary, segment_id: Option<Uuid>) -> String {
    let booking = &itinerary.booking;
    let mut out = String::new();

    let _ = writeln!(out, "E-TICKET");
    let _ = writeln!(out, "Booking reference: {}", booking.id);
    let _ = writeln!(out, "Status: {}", booking.status.as_str());
    let _ = writeln!(out);

    for segment in booking.segments.iter().filter(|s| segment_id.map_or(true, |id| s.id == id)) {
        render_segment(&mut out, itinerary, segment);
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "PASSENGERS");
    for passenger in &booking.passengers {
        let _ = writeln!(out, "  {} ({})", passenger.full_name(), passenger.passenger_type.as_str());
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Total paid: {:.2}", booking.total_amount);
    out
}

#[async_trait]
impl Ticketing for FileTicketStore {
    async fn generate(&self, itinerary: &Itinerary, segment_id: Option<Uuid>) -> CoreResult<String> {
        let booking_id = itinerary.booking.id;
        if let Some(id) = segment_id {
            if itinerary.booking.segment(id).is_none() {
                return Err(CoreError::NotFound(format!("Flight segment with ID {} not found", id)));
            }
        }

        let path = self.path_for(booking_id, segment_id);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
        }
        tokio::fs::write(&path, render_ticket(itinerary, segment_id))
            .await
            .map_err(io_error)?;

        let url = self.url_for(booking_id, segment_id);
        info!(%booking_id, ?segment_id, %url, "Ticket generated");
        Ok(url)
    }

    async fn delete(&self, segment_id: Uuid, booking_id: Uuid) -> CoreResult<()> {
        match tokio::fs::remove_file(self.path_for(booking_id, Some(segment_id))).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%booking_id, %segment_id, "Ticket already gone");
                Ok(())
            }
            Err(e) => Err(io_error(e)),
        }
    }
}
